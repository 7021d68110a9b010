//! Command handlers for the minirag CLI.

pub mod health;
pub mod ingest;
pub mod query;

pub use health::HealthCommand;
pub use ingest::IngestCommand;
pub use query::QueryCommand;
