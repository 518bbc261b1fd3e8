use crate::state::Context;

/// Show when the sources were last refreshed
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let status = ctx.data().engine.status().await;

    let Some(last) = status.last_refreshed else {
        ctx.say("No data fetched yet. The first question (or `/campus refresh`) will fetch it.")
            .await?;
        return Ok(());
    };

    let mut output = format!(
        "**Last refreshed:** <t:{}:R>\n**Cache TTL:** {}s\n\n",
        last.timestamp(),
        ctx.data().engine.cache().ttl().as_secs()
    );
    for source in &status.sources {
        output.push_str(&format!(
            "- **{}** {}\n  <{}> | {} chars | fetched <t:{}:R>\n",
            source.label,
            if source.is_fallback { "(backup data)" } else { "(live)" },
            source.url,
            source.content_length,
            source.fetched_at.timestamp()
        ));
    }

    let archived = ctx.data().archive.list().await?;
    let archived_bytes: usize = archived.iter().map(|p| p.size).sum();
    output.push_str(&format!(
        "\n**Archived pages:** {} ({} bytes)\n",
        archived.len(),
        archived_bytes
    ));

    super::send_chunked(&ctx, &output).await
}
