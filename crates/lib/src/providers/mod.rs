//! # External Providers
//!
//! Clients for the paid APIs this pipeline calls. Every call in here goes
//! through [`crate::retry::RetryPolicy`] and is metered into
//! [`crate::ledger::CostLedger`].

pub mod ai;
