//! # AI Providers

pub mod embedding;

pub use embedding::generate_embedding;
