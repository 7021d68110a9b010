//! Query command handler.

use clap::Args;
use minirag_core::{AppConfig, RagResult};
use minirag_pipeline::{Pipeline, QueryOutcome, QueryRequest};

/// Ask a question over the ingested documents
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// The question to ask
    pub query: String,

    /// Show per-stage timing and cost details
    #[arg(long)]
    pub stats: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> RagResult<()> {
        let pipeline = Pipeline::from_config(config.clone()).await?;
        let outcome = pipeline
            .query(QueryRequest {
                query: self.query.clone(),
            })
            .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            self.print_human(&outcome);
        }

        Ok(())
    }

    fn print_human(&self, outcome: &QueryOutcome) {
        println!("{}", outcome.answer);

        if !outcome.sources.is_empty() {
            println!("\nSources:");
            for (i, source) in outcome.sources.iter().enumerate() {
                let title = source.title.as_deref().unwrap_or("Untitled");
                let cited = if source.cited { "*" } else { " " };
                match source.source.as_deref() {
                    Some(origin) => println!(
                        " {}[{}] {} - ({}) score {:.3}",
                        cited,
                        i + 1,
                        title,
                        origin,
                        source.score
                    ),
                    None => println!(" {}[{}] {} score {:.3}", cited, i + 1, title, source.score),
                }
            }
        }

        if !outcome.has_answer {
            println!("\n(no answer found in the ingested documents)");
        }

        if self.stats {
            println!("\nTiming (s):");
            for (stage, seconds) in &outcome.timing {
                println!("  {:<16} {:.3}", stage, seconds);
            }

            let cost = &outcome.cost_estimate;
            println!(
                "Tokens: {} prompt + {} completion = {} (est. ${:.6})",
                cost.prompt_tokens, cost.completion_tokens, cost.total_tokens, cost.estimated_cost_usd
            );
            if let Some(note) = &cost.note {
                println!("Note: {}", note);
            }
        }
    }
}
