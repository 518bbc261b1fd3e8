use std::time::Duration;

use crate::state::Context;

/// Configure cache and model parameters (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "ttl_secs | model_timeout_secs"] param: Option<String>,
    #[description = "New value"] value: Option<u32>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    let engine = &ctx.data().engine;
    match (param.as_deref(), value) {
        // Show current config
        (None, _) => {
            ctx.say(format!(
                "**Assistant Configuration:**\n\
                 `ttl_secs`: {}\n\
                 `model_timeout_secs`: {}",
                engine.cache().ttl().as_secs(),
                engine.synthesizer().timeout().as_secs()
            ))
            .await?;
        }
        (Some(_), Some(0)) => {
            ctx.say("Value must be greater than zero.").await?;
        }
        // Set a parameter
        (Some(key), Some(val)) => match key {
            "ttl_secs" => {
                engine.cache().set_ttl(Duration::from_secs(val.into()));
                ctx.say(format!("`ttl_secs` set to {}", val)).await?;
            }
            "model_timeout_secs" => {
                engine
                    .synthesizer()
                    .set_timeout(Duration::from_secs(val.into()));
                ctx.say(format!("`model_timeout_secs` set to {}", val))
                    .await?;
            }
            _ => {
                ctx.say(format!(
                    "Unknown param `{}`. Valid: `ttl_secs`, `model_timeout_secs`",
                    key
                ))
                .await?;
            }
        },
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/campus config ttl_secs 1800`")
                .await?;
        }
    }

    Ok(())
}
