use std::collections::BTreeSet;

use html2text::render::text_renderer::TrivialDecorator;
use serde_json::{json, Value};

use crate::core::feed::types::FeedEntry;
use crate::core::tags::Categories;

const STRIP_WIDTH: usize = 10_000;
const EMBED_DESCRIPTION_LIMIT: usize = 4096;
const EMPTY_FIELD: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// Discord webhook with a rich embed.
    DiscordEmbed,
    /// Single `content` key, accepted by most chat webhooks.
    Flat,
}

impl PayloadFormat {
    pub fn for_url(url: &str) -> Self {
        let Ok(parsed) = reqwest::Url::parse(url) else {
            return PayloadFormat::Flat;
        };
        let is_discord_host = parsed.host_str().is_some_and(|host| {
            matches!(
                host,
                "discord.com"
                    | "discordapp.com"
                    | "ptb.discord.com"
                    | "canary.discord.com"
                    | "ptb.discordapp.com"
                    | "canary.discordapp.com"
            )
        });
        if is_discord_host && parsed.path().starts_with("/api/webhooks/") {
            PayloadFormat::DiscordEmbed
        } else {
            PayloadFormat::Flat
        }
    }
}

pub fn strip_html(html: &str) -> String {
    let config = html2text::config::with_decorator(TrivialDecorator::new());
    let text = match config.string_from_read(html.as_bytes(), STRIP_WIDTH) {
        Ok(text) => text,
        Err(error) => {
            tracing::debug!(%error, "html2text failed, keeping raw summary");
            html.to_string()
        }
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn join_field(values: &BTreeSet<String>) -> String {
    let joined = values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        EMPTY_FIELD.to_string()
    } else {
        joined
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

pub fn build_payload(
    format: PayloadFormat,
    entry: &FeedEntry,
    categories: &Categories,
    summary: &str,
    bot_name: &str,
) -> Value {
    match format {
        PayloadFormat::DiscordEmbed => json!({
            "username": bot_name,
            "embeds": [{
                "title": entry.title,
                "description": truncate_chars(summary, EMBED_DESCRIPTION_LIMIT),
                "url": entry.link,
                "footer": { "text": entry.published_at.to_rfc2822() },
                "fields": [
                    {
                        "name": "Product",
                        "value": join_field(&categories.products),
                        "inline": true
                    },
                    {
                        "name": "Marchitecture",
                        "value": join_field(&categories.marchitecture),
                        "inline": true
                    }
                ]
            }]
        }),
        PayloadFormat::Flat => json!({ "content": entry.link }),
    }
}
