use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use serde::Deserialize;

use super::types::{FeedEntry, ParsedFeed};

#[derive(Debug, thiserror::Error)]
pub enum FeedParseError {
    #[error("feed payload is empty")]
    EmptyPayload,
    #[error("xml feed parse error: {0}")]
    Xml(#[from] feed_rs::parser::ParseFeedError),
    #[error("json feed parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct JsonFeed {
    title: Option<String>,
    #[serde(default)]
    items: Vec<JsonFeedItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct JsonFeedItem {
    title: Option<String>,
    url: Option<String>,
    summary: Option<String>,
    content_html: Option<String>,
    date_published: Option<String>,
    date_modified: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

pub fn parse_feed_bytes(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let trimmed = raw.trim_ascii_start();
    if trimmed.is_empty() {
        return Err(FeedParseError::EmptyPayload);
    }
    if trimmed[0] == b'{' {
        return parse_json_feed(trimmed);
    }
    parse_xml_feed(trimmed)
}

fn parse_xml_feed(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let feed = feed_rs::parser::parse(raw)?;
    let title = feed
        .title
        .as_ref()
        .map(|text| text.content.clone())
        .unwrap_or_else(|| "Untitled Feed".to_string());
    let entries = feed.entries.iter().filter_map(entry_from_xml).collect();

    Ok(ParsedFeed { title, entries })
}

fn parse_json_feed(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let feed: JsonFeed = serde_json::from_slice(raw)?;
    let title = feed.title.unwrap_or_else(|| "Untitled Feed".to_string());
    let entries = feed
        .items
        .into_iter()
        .filter_map(|item| {
            let link = item.url.unwrap_or_default();
            let published_at = item
                .date_published
                .or(item.date_modified)
                .as_deref()
                .and_then(parse_json_date);
            let Some(published_at) = published_at else {
                tracing::warn!(%link, "dropping feed item without a usable date");
                return None;
            };
            Some(FeedEntry {
                title: item.title.unwrap_or_else(|| "Untitled Entry".to_string()),
                link,
                published_at,
                raw_summary: item.summary.or(item.content_html).unwrap_or_default(),
                raw_tag_term: item.tags.join(","),
            })
        })
        .collect();

    Ok(ParsedFeed { title, entries })
}

fn parse_json_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

fn entry_from_xml(entry: &Entry) -> Option<FeedEntry> {
    let link = entry
        .links
        .first()
        .map(|entry_link| entry_link.href.clone())
        .unwrap_or_default();
    let Some(published_at) = entry.published.or(entry.updated) else {
        tracing::warn!(%link, id = %entry.id, "dropping feed item without a usable date");
        return None;
    };
    let title = entry
        .title
        .as_ref()
        .map(|text| text.content.clone())
        .unwrap_or_else(|| "Untitled Entry".to_string());
    let raw_summary = entry
        .summary
        .as_ref()
        .map(|text| text.content.clone())
        .or_else(|| {
            entry
                .content
                .as_ref()
                .and_then(|content| content.body.clone())
        })
        .unwrap_or_default();
    let raw_tag_term = entry
        .categories
        .iter()
        .map(|category| category.term.trim())
        .filter(|term| !term.is_empty())
        .collect::<Vec<_>>()
        .join(",");

    Some(FeedEntry {
        title,
        link,
        published_at,
        raw_summary,
        raw_tag_term,
    })
}
