//! Ingest command handler.

use clap::Args;
use minirag_core::{AppConfig, RagError, RagResult};
use minirag_pipeline::{IngestRequest, Pipeline};
use std::path::PathBuf;

/// Ingest a document into the vector store
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Document text (alternative to --file)
    pub text: Option<String>,

    /// Read document text from file
    #[arg(short, long, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Document title
    #[arg(short, long)]
    pub title: Option<String>,

    /// Document source label (defaults to the file name when reading a file)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> RagResult<()> {
        let (text, file_name) = self.read_text()?;
        let source = self.source.clone().or(file_name);

        let pipeline = Pipeline::from_config(config.clone()).await?;
        let outcome = pipeline
            .ingest(IngestRequest {
                text,
                title: self.title.clone(),
                source,
            })
            .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            println!("{}", outcome.message);
            println!(
                "Document {} stored as {} chunk(s)",
                outcome.document_id, outcome.chunks_created
            );
        }

        Ok(())
    }

    /// Read document text from the positional argument or --file.
    fn read_text(&self) -> RagResult<(String, Option<String>)> {
        if let Some(text) = &self.text {
            return Ok((text.clone(), None));
        }

        if let Some(path) = &self.file {
            let text = std::fs::read_to_string(path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            return Ok((text, name));
        }

        Err(RagError::InvalidRequest(
            "Provide document text or --file".to_string(),
        ))
    }
}
