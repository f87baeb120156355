pub mod core;

use std::time::Duration;

use chrono::Utc;

use crate::core::config::AppConfig;
use crate::core::delivery::WebhookTransport;
use crate::core::dispatch::{DispatchSettings, Dispatcher, RunReport};
use crate::core::feed::{FeedSource, HttpFeedSource};
use crate::core::routing::mapping::{ChannelMapping, MappingError};
use crate::core::routing::registry::WebhookRegistry;
use crate::core::storage::{ParameterRepository, StorageError};
use crate::core::telemetry::init_tracing;
use crate::core::translate::{
    ChatCompletionTranslator, PassthroughTranslator, TranslateError, Translator,
};
use crate::core::window::PollWindow;

const HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::core::config::ConfigError),
    #[error("parameter store error: {0}")]
    Storage(#[from] StorageError),
    #[error("channel mapping error: {0}")]
    Mapping(#[from] MappingError),
    #[error("translator error: {0}")]
    Translator(#[from] TranslateError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct App {
    feed: HttpFeedSource,
    dispatcher: Dispatcher,
}

impl App {
    pub async fn build(config: &AppConfig) -> Result<Self, AppError> {
        let repository = ParameterRepository::connect(&config.database_url).await?;
        if let Some(path) = &config.parameters_file {
            let imported = repository.import_parameters_file(path).await?;
            tracing::info!(path = %path.display(), imported, "parameters seeded");
        }
        let registry = WebhookRegistry::load(&repository, &config.webhook_path).await?;

        let mapping = ChannelMapping::load(config.channels_file.as_deref())?;
        let mapping_source = config
            .channels_file
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "bundled".to_string());
        tracing::info!(channels = mapping.len(), source = %mapping_source, "channel mapping loaded");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        let translator: Box<dyn Translator> = match &config.translator {
            Some(llm) => Box::new(ChatCompletionTranslator::new(client.clone(), llm.clone())?),
            None => Box::new(PassthroughTranslator),
        };
        tracing::info!(
            translator = translator.name(),
            source_language = %config.source_language,
            target_language = %config.target_language,
            "translator ready"
        );

        let dispatcher = Dispatcher::new(
            mapping,
            registry,
            PollWindow::from_secs(config.poll_interval_secs),
            translator,
            Box::new(WebhookTransport::new(client.clone())),
            DispatchSettings {
                bot_name: config.bot_name.clone(),
                source_language: config.source_language.clone(),
                target_language: config.target_language.clone(),
            },
        );

        Ok(Self {
            feed: HttpFeedSource::new(client, config.feed_url.clone()),
            dispatcher,
        })
    }

    /// Polls once per window. Each tick evaluates the window ending at its
    /// scheduled time, so consecutive polls cover adjacent intervals.
    pub async fn run_schedule(&self, run_once: bool) {
        let window = self.dispatcher.window();
        let period = window.width().to_std().unwrap_or(Duration::from_secs(3600));
        let started_at = Utc::now();
        let mut ticker = tokio::time::interval(period);
        let mut ticks: u32 = 0;

        tracing::info!(feed = %self.feed.url(), period_secs = period.as_secs(), "scheduler started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown requested");
                    break;
                }
            }
            let now = window.tick_at(started_at, ticks);
            ticks = ticks.saturating_add(1);

            poll_once(&self.feed, &self.dispatcher, now).await;
            if run_once {
                break;
            }
        }
    }
}

pub async fn poll_once(
    feed: &dyn FeedSource,
    dispatcher: &Dispatcher,
    now: chrono::DateTime<Utc>,
) -> RunReport {
    let entries = match feed.fetch_entries().await {
        Ok(entries) => entries,
        Err(error) => {
            tracing::error!(%error, "feed retrieval failed, treating as empty feed");
            Vec::new()
        }
    };

    let report = dispatcher.run(entries, now).await;
    tracing::info!(
        %now,
        entries = report.entries.len(),
        routed = report.routed(),
        skipped = report.skipped(),
        delivered = report.delivered(),
        failed = report.failed(),
        unresolved = report.unresolved(),
        "poll finished"
    );
    report
}

pub async fn run() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    let app = App::build(&config).await?;
    app.run_schedule(config.run_once).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatch::EntryOutcome;
    use crate::core::feed::FeedError;
    use crate::core::feed::parser::FeedParseError;
    use crate::core::feed::types::FeedEntry;
    use async_trait::async_trait;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::TimeZone;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    struct BrokenFeed;

    #[async_trait]
    impl FeedSource for BrokenFeed {
        async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, FeedError> {
            Err(FeedError::Parse(FeedParseError::EmptyPayload))
        }
    }

    type Posts = Arc<Mutex<Vec<(String, Value)>>>;

    async fn hook_handler(
        State(posts): State<Posts>,
        Path(channel): Path<String>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        posts
            .lock()
            .expect("lock should not be poisoned")
            .push((channel, body));
        StatusCode::NO_CONTENT
    }

    async fn spawn_server() -> (String, Posts, tokio::task::JoinHandle<()>) {
        let posts: Posts = Arc::default();
        let app = Router::new()
            .route(
                "/feed.xml",
                get(|| async { include_str!("../fixtures/whats-new.rss.xml") }),
            )
            .route("/hooks/{channel}", post(hook_handler))
            .with_state(posts.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        let join_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server should run");
        });
        (format!("http://{address}"), posts, join_handle)
    }

    fn dispatcher(registry: WebhookRegistry) -> Dispatcher {
        Dispatcher::new(
            ChannelMapping::bundled().expect("bundled mapping must parse"),
            registry,
            PollWindow::hourly(),
            Box::new(PassthroughTranslator),
            Box::new(WebhookTransport::new(reqwest::Client::new())),
            DispatchSettings::default(),
        )
    }

    #[tokio::test]
    async fn feed_failure_is_treated_as_empty_poll() {
        let dispatcher = dispatcher(WebhookRegistry::default());
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 10, 0, 0).unwrap();

        let report = poll_once(&BrokenFeed, &dispatcher, now).await;

        assert!(report.entries.is_empty());
    }

    #[tokio::test]
    async fn poll_routes_only_entries_inside_the_window() {
        let (base, posts, server_task) = spawn_server().await;
        let registry: WebhookRegistry = [
            ("containers", format!("{base}/hooks/containers")),
            ("machine-learning", format!("{base}/hooks/machine-learning")),
            ("default", format!("{base}/hooks/default")),
        ]
        .into_iter()
        .collect();
        let dispatcher = dispatcher(registry);
        let feed = HttpFeedSource::new(reqwest::Client::new(), format!("{base}/feed.xml"));
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 10, 0, 0).unwrap();

        let report = poll_once(&feed, &dispatcher, now).await;

        assert_eq!(report.entries.len(), 3);
        assert!(matches!(report.entries[0].outcome, EntryOutcome::Routed { .. }));
        assert_eq!(report.entries[1].outcome, EntryOutcome::SkippedOutsideWindow);
        assert_eq!(report.entries[2].outcome, EntryOutcome::SkippedNoTags);
        assert_eq!(report.delivered(), 1);

        let posts = posts.lock().expect("lock should not be poisoned");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "containers");
        assert_eq!(
            posts[0].1["content"],
            "https://aws.amazon.com/about-aws/whats-new/2026/10/amazon-ecs-service-connect-metrics/"
        );
        drop(posts);
        server_task.abort();
    }

    #[tokio::test]
    async fn next_window_picks_up_the_earlier_entry() {
        let (base, posts, server_task) = spawn_server().await;
        let registry: WebhookRegistry = [
            ("machine-learning", format!("{base}/hooks/machine-learning")),
            ("default", format!("{base}/hooks/default")),
        ]
        .into_iter()
        .collect();
        let dispatcher = dispatcher(registry);
        let feed = HttpFeedSource::new(reqwest::Client::new(), format!("{base}/feed.xml"));
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();

        let report = poll_once(&feed, &dispatcher, now).await;

        assert_eq!(report.routed(), 1);
        let posts = posts.lock().expect("lock should not be poisoned");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "machine-learning");
        drop(posts);
        server_task.abort();
    }
}
