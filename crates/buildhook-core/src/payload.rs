//! Webhook payload construction
//!
//! One builder serves every lifecycle event; the event kind decides which URLs
//! and fields are available.

use std::collections::BTreeMap;

use buildhook_api::{
    ArtifactMap,
    BuildEvent,
    BuildEventKind,
    BuildStatus,
    PayloadBuild,
    WebhookPayload,
    WebhookResult,
};
use chrono::{
    DateTime,
    Utc,
};

use crate::artifacts::ArtifactResolver;
use crate::scm::resolve_scm;

/// Build parameter carrying the build date set by the build script
pub const BUILD_DATE_PARAMETER: &str = "env.BuildDate";

pub struct PayloadBuilder {
    artifacts: ArtifactResolver,
}

impl PayloadBuilder {
    pub fn new(artifacts: ArtifactResolver) -> Self {
        Self { artifacts }
    }

    fn root_url(&self) -> &str {
        self.artifacts.root_url()
    }

    /// Assembles the payload for one event. Resolver errors propagate.
    pub async fn build(
        &self, kind: BuildEventKind, event: &BuildEvent, status: BuildStatus,
        started_at: Option<DateTime<Utc>>, finished_at: Option<DateTime<Utc>>,
    ) -> WebhookResult<WebhookPayload> {
        let root = self.root_url();

        let (full_url, build_id, artifacts) = if kind == BuildEventKind::Queued {
            (
                format!("{}/viewQueued.html?itemId={}", root, event.queue_item_id),
                None,
                ArtifactMap::new(),
            )
        } else {
            (
                format!(
                    "{}/viewLog.html?buildTypeId={}&buildId={}",
                    root, event.build_type_id, event.build_id
                ),
                Some(event.build_number.clone()),
                self.artifacts.resolve(event).await?,
            )
        };

        Ok(WebhookPayload {
            name: event.full_name.clone(),
            url: format!("{}/viewType.html?buildTypeId={}", root, event.build_type_id),
            build: PayloadBuild {
                full_url,
                build_id,
                status,
                started_at,
                finished_at,
                scm: resolve_scm(kind, event),
                artifacts,
                parameters: payload_parameters(event),
            },
        })
    }
}

fn payload_parameters(event: &BuildEvent) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    if let Some(date) = event.parameter(BUILD_DATE_PARAMETER) {
        result.insert("build_date".to_string(), date.to_string());
    }
    result
}

/// Serializes the payload as pretty JSON and checks it parses back into a
/// generic map.
pub fn serialize_payload(payload: &WebhookPayload) -> WebhookResult<String> {
    let json = serde_json::to_string_pretty(payload)?;
    serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&json)?;
    Ok(json)
}
