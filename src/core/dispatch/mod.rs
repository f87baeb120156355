//! Per-poll orchestration: tag check, window filter, tag parsing, routing
//! and delivery for every feed entry.
//!
//! Entries and destinations are handled one after another. A failure on one
//! destination is recorded and never stops the rest of the run.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::core::delivery::Transport;
use crate::core::feed::types::FeedEntry;
use crate::core::payload::{build_payload, strip_html, PayloadFormat};
use crate::core::routing::mapping::ChannelMapping;
use crate::core::routing::registry::WebhookRegistry;
use crate::core::routing::{route, Destination, RoutingResult};
use crate::core::tags::{parse_tag_term, Categories};
use crate::core::translate::{TranslateError, Translator};
use crate::core::window::PollWindow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    pub bot_name: String,
    pub source_language: String,
    pub target_language: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            bot_name: "aws-update-notification".to_string(),
            source_language: "en".to_string(),
            target_language: "ja".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub channel: String,
    pub url: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl DeliveryOutcome {
    fn failed(destination: &Destination, error: String) -> Self {
        Self {
            channel: destination.channel.clone(),
            url: destination.url.clone(),
            success: false,
            error: Some(error),
            duration_ms: 0,
        }
    }
}

/// A required channel with no webhook, and the embed it would have received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingWebhook {
    pub channel: String,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryOutcome {
    SkippedNoTags,
    SkippedOutsideWindow,
    Routed {
        routing: RoutingResult,
        deliveries: Vec<DeliveryOutcome>,
        missing_webhooks: Vec<MissingWebhook>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub title: String,
    pub link: String,
    pub outcome: EntryOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub now: DateTime<Utc>,
    pub entries: Vec<EntryReport>,
}

impl RunReport {
    fn deliveries(&self) -> impl Iterator<Item = &DeliveryOutcome> {
        self.entries.iter().flat_map(|entry| match &entry.outcome {
            EntryOutcome::Routed { deliveries, .. } => deliveries.as_slice(),
            _ => &[][..],
        })
    }

    pub fn routed(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, EntryOutcome::Routed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.len() - self.routed()
    }

    pub fn delivered(&self) -> usize {
        self.deliveries().filter(|delivery| delivery.success).count()
    }

    pub fn failed(&self) -> usize {
        self.deliveries().filter(|delivery| !delivery.success).count()
    }

    pub fn unresolved(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match &entry.outcome {
                EntryOutcome::Routed { routing, .. } => routing.unresolved.len(),
                _ => 0,
            })
            .sum()
    }
}

pub struct Dispatcher {
    mapping: ChannelMapping,
    registry: WebhookRegistry,
    window: PollWindow,
    translator: Box<dyn Translator>,
    transport: Box<dyn Transport>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        mapping: ChannelMapping,
        registry: WebhookRegistry,
        window: PollWindow,
        translator: Box<dyn Translator>,
        transport: Box<dyn Transport>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            mapping,
            registry,
            window,
            translator,
            transport,
            settings,
        }
    }

    pub fn window(&self) -> PollWindow {
        self.window
    }

    pub async fn run(&self, entries: Vec<FeedEntry>, now: DateTime<Utc>) -> RunReport {
        let mut reports = Vec::with_capacity(entries.len());
        for entry in entries {
            let outcome = self.process_entry(&entry, now).await;
            reports.push(EntryReport {
                title: entry.title,
                link: entry.link,
                outcome,
            });
        }
        RunReport {
            now,
            entries: reports,
        }
    }

    async fn process_entry(&self, entry: &FeedEntry, now: DateTime<Utc>) -> EntryOutcome {
        if !entry.has_tags() {
            tracing::trace!(link = %entry.link, "entry has no tags");
            return EntryOutcome::SkippedNoTags;
        }
        if !self.window.contains(entry.published_at, now) {
            tracing::trace!(
                link = %entry.link,
                published_at = %entry.published_at,
                "entry outside poll window"
            );
            return EntryOutcome::SkippedOutsideWindow;
        }

        let categories = parse_tag_term(&entry.raw_tag_term);
        let routing = route(&categories, &self.mapping, &self.registry);
        tracing::debug!(
            link = %entry.link,
            matched = ?routing.matched,
            default_fired = routing.default_fired,
            "entry routed"
        );
        let missing_webhooks = self.report_missing_webhooks(entry, &categories, &routing);

        let deliveries = self.deliver(entry, &categories, &routing).await;
        EntryOutcome::Routed {
            routing,
            deliveries,
            missing_webhooks,
        }
    }

    /// Unresolved channels carry the untranslated embed so the entry can be
    /// posted by hand once the webhook is registered.
    fn report_missing_webhooks(
        &self,
        entry: &FeedEntry,
        categories: &Categories,
        routing: &RoutingResult,
    ) -> Vec<MissingWebhook> {
        if routing.unresolved.is_empty() {
            return Vec::new();
        }
        let summary = strip_html(&entry.raw_summary);
        routing
            .unresolved
            .iter()
            .map(|channel| {
                let payload = build_payload(
                    PayloadFormat::DiscordEmbed,
                    entry,
                    categories,
                    &summary,
                    &self.settings.bot_name,
                );
                tracing::error!(
                    channel = %channel,
                    link = %entry.link,
                    %payload,
                    "\"{channel}\" not in parameter store"
                );
                MissingWebhook {
                    channel: channel.clone(),
                    payload,
                }
            })
            .collect()
    }

    async fn deliver(
        &self,
        entry: &FeedEntry,
        categories: &Categories,
        routing: &RoutingResult,
    ) -> Vec<DeliveryOutcome> {
        if routing.destinations.is_empty() {
            return Vec::new();
        }

        // Flat payloads only carry the link.
        let carries_summary = routing.destinations.iter().any(|destination| {
            PayloadFormat::for_url(&destination.url) == PayloadFormat::DiscordEmbed
        });
        let summary = if carries_summary {
            self.prepare_summary(entry).await
        } else {
            Ok(String::new())
        };
        let summary = match summary {
            Ok(summary) => summary,
            Err(error) => {
                tracing::error!(
                    link = %entry.link,
                    translator = self.translator.name(),
                    error = %error,
                    "summary translation failed, skipping entry"
                );
                return routing
                    .destinations
                    .iter()
                    .map(|destination| DeliveryOutcome::failed(destination, error.to_string()))
                    .collect();
            }
        };

        let mut outcomes = Vec::with_capacity(routing.destinations.len());
        for destination in &routing.destinations {
            let format = PayloadFormat::for_url(&destination.url);
            let payload = build_payload(
                format,
                entry,
                categories,
                &summary,
                &self.settings.bot_name,
            );

            let start = Instant::now();
            let result = self.transport.post(&destination.url, &payload).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::info!(
                        channel = %destination.channel,
                        link = %entry.link,
                        duration_ms,
                        "notification delivered"
                    );
                    (true, None)
                }
                Err(error) => {
                    tracing::warn!(
                        channel = %destination.channel,
                        link = %entry.link,
                        error = %error,
                        duration_ms,
                        "notification delivery failed"
                    );
                    (false, Some(error.to_string()))
                }
            };

            outcomes.push(DeliveryOutcome {
                channel: destination.channel.clone(),
                url: destination.url.clone(),
                success,
                error,
                duration_ms,
            });
        }
        outcomes
    }

    async fn prepare_summary(&self, entry: &FeedEntry) -> Result<String, TranslateError> {
        let text = strip_html(&entry.raw_summary);
        if text.is_empty() {
            return Ok(text);
        }
        self.translator
            .translate(
                &text,
                &self.settings.source_language,
                &self.settings.target_language,
            )
            .await
    }
}
