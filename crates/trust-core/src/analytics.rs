//! Fire-and-forget analytics.

use crate::model::AnalyticsEvent;
use tracing::{debug, warn};
use trust_store::collections::ANALYTICS;
use trust_store::{DocumentStore, fields};

/// Append an analytics event. Failures are logged and swallowed.
pub async fn record_event<S: DocumentStore>(store: &S, event: AnalyticsEvent) {
    let event_type = event.event_type.clone();
    let patch = match fields(&event) {
        Ok(patch) => patch,
        Err(e) => {
            warn!(event_type = %event_type, error = %e, "failed to encode analytics event");
            return;
        }
    };
    match store.create(ANALYTICS, patch).await {
        Ok(record) => debug!(event_type = %event_type, id = %record.id, "analytics event recorded"),
        Err(e) => warn!(event_type = %event_type, error = %e, "failed to record analytics event"),
    }
}
