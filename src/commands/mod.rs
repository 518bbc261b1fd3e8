mod ask;
mod config;
mod lookup;
mod refresh;
mod status;

use crate::state::Context;

/// Campus - RV University assistant
#[poise::command(
    slash_command,
    subcommands(
        "ask::ask",
        "status::status",
        "refresh::refresh",
        "lookup::lookup",
        "config::config"
    )
)]
pub async fn campus(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Send a message in Discord-safe chunks (max 1990 chars), split on a
/// newline or space where possible.
pub(crate) async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in split_chunks(text, 1990) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

fn split_chunks(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let mut limit = remaining.len().min(max);
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        let split_at = if limit < remaining.len() {
            remaining[..limit]
                .rfind('\n')
                .or_else(|| remaining[..limit].rfind(' '))
                .map(|i| i + 1)
                .unwrap_or(limit)
        } else {
            limit
        };
        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::split_chunks;

    #[test]
    fn chunks_respect_limit_and_boundaries() {
        let text = format!("{}\n{}", "a".repeat(15), "b".repeat(15));
        let chunks = split_chunks(&text, 20);
        assert_eq!(chunks, vec![format!("{}\n", "a".repeat(15)), "b".repeat(15)]);

        let unicode = "é".repeat(30);
        let chunks = split_chunks(&unicode, 7);
        assert!(chunks.iter().all(|c| c.len() <= 7));
        assert_eq!(chunks.concat(), unicode);
    }
}
