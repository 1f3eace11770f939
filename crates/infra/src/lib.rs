//! Infrastructure layer: configuration and storage backends.

pub mod config;
pub mod store;
