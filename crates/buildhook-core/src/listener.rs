use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use buildhook_api::{
    BuildEvent,
    BuildEventKind,
    BuildListener,
    BuildStatus,
    WebhookResult,
    WebhookSettings,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::Serialize;

use crate::dispatcher::{
    DeliveryOutcome,
    Dispatcher,
};
use crate::payload::{
    serialize_payload,
    PayloadBuilder,
};
use crate::status::classify_status;

/// What happened to one lifecycle event
#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub event: BuildEventKind,
    pub status: BuildStatus,
    #[serde(skip)]
    pub payload: String,
    pub deliveries: Vec<DeliveryOutcome>,
    pub skipped_personal: bool,
}

/// Turns build lifecycle events into webhook deliveries
pub struct WebhooksListener {
    settings: Arc<dyn WebhookSettings>,
    builder: PayloadBuilder,
    dispatcher: Dispatcher,
}

impl WebhooksListener {
    pub fn new(
        settings: Arc<dyn WebhookSettings>, builder: PayloadBuilder, dispatcher: Dispatcher,
    ) -> Self {
        Self {
            settings,
            builder,
            dispatcher,
        }
    }

    /// Builds, validates and delivers the payload for one event.
    pub async fn handle(
        &self, kind: BuildEventKind, event: &BuildEvent,
    ) -> WebhookResult<EventReport> {
        let time = Instant::now();

        let status = classify_status(kind, event);
        let (started_at, finished_at) = lifecycle_times(kind, event);

        let payload = self
            .builder
            .build(kind, event, status.clone(), started_at, finished_at)
            .await?;
        let payload = serialize_payload(&payload)?;

        tracing::info!(
            build = %event.full_name,
            number = %event.build_number,
            event = %kind,
            "Build '{}/#{}' {}, payload is '{}'",
            event.full_name,
            event.build_number,
            kind,
            payload
        );

        let deliveries = if event.personal {
            tracing::info!(build = %event.full_name, "Skipping post for personal build.");
            Vec::new()
        } else {
            let urls = self.settings.urls(&event.project_id);
            if urls.is_empty() {
                tracing::debug!(project = %event.project_id, "No webhook URLs configured");
            }
            self.dispatcher.dispatch(&urls, &payload).await
        };

        let elapsed_ms = time.elapsed().as_millis();
        tracing::info!(
            event = %kind,
            elapsed_ms = %elapsed_ms,
            "Operation finished in {} ms",
            elapsed_ms
        );

        Ok(EventReport {
            event: kind,
            status,
            payload,
            deliveries,
            skipped_personal: event.personal,
        })
    }

    /// Like [`handle`](Self::handle), but logs and swallows any failure.
    pub async fn on_event(&self, kind: BuildEventKind, event: &BuildEvent) -> Option<EventReport> {
        match self.handle(kind, event).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(
                    build = %event.full_name,
                    number = %event.build_number,
                    event = %kind,
                    error = %e,
                    "Failed to handle {} event of '{}' #{}",
                    kind,
                    event.full_name,
                    event.build_number
                );
                None
            }
        }
    }
}

fn lifecycle_times(
    kind: BuildEventKind, event: &BuildEvent,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match kind {
        BuildEventKind::Queued => (None, None),
        BuildEventKind::Started => (event.started_at, None),
        BuildEventKind::Finished | BuildEventKind::Interrupted => (
            event.started_at,
            Some(event.finished_at.unwrap_or_else(Utc::now)),
        ),
    }
}

#[async_trait]
impl BuildListener for WebhooksListener {
    type Report = EventReport;

    async fn build_queued(&self, event: &BuildEvent) -> Option<EventReport> {
        self.on_event(BuildEventKind::Queued, event).await
    }

    async fn changes_loaded(&self, event: &BuildEvent) -> Option<EventReport> {
        self.on_event(BuildEventKind::Started, event).await
    }

    async fn build_finished(&self, event: &BuildEvent) -> Option<EventReport> {
        self.on_event(BuildEventKind::Finished, event).await
    }

    async fn build_interrupted(&self, event: &BuildEvent) -> Option<EventReport> {
        self.on_event(BuildEventKind::Interrupted, event).await
    }
}
