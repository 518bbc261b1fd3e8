use tracing::info;

use crate::state::Context;

/// Re-fetch every source now (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn refresh(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    if !ctx.data().is_admin(ctx.author().id.get()) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    ctx.defer().await?;
    info!(user = %ctx.author().name, "Forced refresh requested");

    let summary = ctx.data().engine.force_refresh().await;
    ctx.say(format!(
        "Data refreshed: {} live source(s), {} served from backup data.",
        summary.live, summary.fallback
    ))
    .await?;
    Ok(())
}
