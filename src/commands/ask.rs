use tracing::{error, info};

use super::send_chunked;
use crate::error::QueryError;
use crate::rag::prompts::TECHNICAL_DIFFICULTIES;
use crate::state::Context;

/// Ask a question about RV University
#[poise::command(slash_command, guild_only)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your question"] question: String,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    info!(user = %ctx.author().name, question = %question, "Query started");

    let reply = match ctx.data().engine.process_query(&question).await {
        Ok(response) => {
            info!(
                outcome = response.outcome,
                answer_len = response.answer.len(),
                "Query complete"
            );
            let mut full = format!("**Q:** {}\n\n**A:** {}", question, response.answer);
            if !response.sources.is_empty() {
                full.push_str("\n\n**Sources:**\n");
                for url in &response.sources {
                    full.push_str(&format!("- <{}>\n", url));
                }
            }
            full
        }
        Err(QueryError::EmptyQuery) => "Please include a question.".to_string(),
        Err(e) => {
            error!(error = %e, "Query failed");
            TECHNICAL_DIFFICULTIES.to_string()
        }
    };

    send_chunked(&ctx, &reply).await
}
