//! Health command handler.

use clap::Args;
use minirag_core::{AppConfig, RagResult};
use minirag_pipeline::Pipeline;

/// Check vector store connectivity
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> RagResult<()> {
        let pipeline = Pipeline::from_config(config.clone()).await?;
        let report = pipeline.health().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("Status: {}", report.status);
            println!("Vector store connected: {}", report.vector_store_connected);
            println!("Collection exists: {}", report.collection_exists);
            println!("Stored chunks: {}", report.document_count);
        }

        Ok(())
    }
}
