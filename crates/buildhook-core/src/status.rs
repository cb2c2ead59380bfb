//! Status derivation for webhook payloads

use buildhook_api::{
    BuildEvent,
    BuildEventKind,
    BuildStatus,
};

/// Failure reason reported when the build failed during source checkout
pub const CHECKOUT_FAILURE_MARKER: &str = "gitcrap";

/// Derives the payload status for a build event.
///
/// For finished and interrupted builds the first matching rule wins: checkout
/// failure, internal error, cancellation, interruption, then the host status.
pub fn classify_status(kind: BuildEventKind, event: &BuildEvent) -> BuildStatus {
    match kind {
        BuildEventKind::Queued => BuildStatus::Queued,
        BuildEventKind::Started => BuildStatus::Pending,
        BuildEventKind::Finished | BuildEventKind::Interrupted => {
            let interrupted = kind == BuildEventKind::Interrupted || event.interrupted;

            if event
                .failure_reasons
                .iter()
                .any(|reason| reason == CHECKOUT_FAILURE_MARKER)
            {
                tracing::info!(
                    build = %event.full_name,
                    number = %event.build_number,
                    "Setting payload status to \"error\" as failure is during source checkout"
                );
                BuildStatus::Error
            } else if event.internal_error {
                BuildStatus::Error
            } else if interrupted && event.cancelled {
                BuildStatus::Cancelled
            } else if interrupted {
                BuildStatus::Error
            } else {
                BuildStatus::Host(event.status_text.to_lowercase())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(status_text: &str) -> BuildEvent {
        BuildEvent {
            full_name: "Echo :: Build".to_string(),
            build_number: "12".to_string(),
            status_text: status_text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_queued_and_started_are_fixed() {
        let mut event = finished("Failure");
        event.internal_error = true;
        event.failure_reasons = vec![CHECKOUT_FAILURE_MARKER.to_string()];

        assert_eq!(
            classify_status(BuildEventKind::Queued, &event),
            BuildStatus::Queued
        );
        assert_eq!(
            classify_status(BuildEventKind::Started, &event),
            BuildStatus::Pending
        );
    }

    #[test]
    fn test_host_status_is_lowercased() {
        assert_eq!(
            classify_status(BuildEventKind::Finished, &finished("SUCCESS")),
            BuildStatus::Host("success".to_string())
        );
        assert_eq!(
            classify_status(BuildEventKind::Finished, &finished("Failure")),
            BuildStatus::Host("failure".to_string())
        );
    }

    #[test]
    fn test_checkout_failure_wins_over_everything() {
        let mut event = finished("Success");
        event.failure_reasons = vec!["compile".to_string(), CHECKOUT_FAILURE_MARKER.to_string()];
        event.interrupted = true;
        event.cancelled = true;

        assert_eq!(
            classify_status(BuildEventKind::Finished, &event),
            BuildStatus::Error
        );
        assert_eq!(
            classify_status(BuildEventKind::Interrupted, &event),
            BuildStatus::Error
        );
    }

    #[test]
    fn test_internal_error_wins_over_cancellation() {
        let mut event = finished("Success");
        event.internal_error = true;
        event.cancelled = true;

        assert_eq!(
            classify_status(BuildEventKind::Interrupted, &event),
            BuildStatus::Error
        );
    }

    #[test]
    fn test_interruption_with_and_without_cancel_info() {
        let mut event = finished("Success");
        assert_eq!(
            classify_status(BuildEventKind::Interrupted, &event),
            BuildStatus::Error
        );

        event.cancelled = true;
        assert_eq!(
            classify_status(BuildEventKind::Interrupted, &event),
            BuildStatus::Cancelled
        );
    }

    #[test]
    fn test_finished_build_carrying_interruption_flag() {
        let mut event = finished("Success");
        event.interrupted = true;
        event.cancelled = true;
        assert_eq!(
            classify_status(BuildEventKind::Finished, &event),
            BuildStatus::Cancelled
        );

        event.cancelled = false;
        assert_eq!(
            classify_status(BuildEventKind::Finished, &event),
            BuildStatus::Error
        );
    }

    #[test]
    fn test_cancel_info_alone_is_ignored_on_finish() {
        let mut event = finished("Success");
        event.cancelled = true;

        assert_eq!(
            classify_status(BuildEventKind::Finished, &event),
            BuildStatus::Host("success".to_string())
        );
    }
}
