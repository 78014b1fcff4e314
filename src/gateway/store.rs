use chrono::{DateTime, Utc};

use crate::errors::{CountQueryError, RowQueryError};
use crate::models::{AnalyticsEvent, EventCount, TimeWindow};

#[async_trait::async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Events at or after `start` (all of them when `None`), optionally
    /// restricted to one event type, newest first.
    async fn fetch_rows(
        &self,
        start: Option<DateTime<Utc>>,
        event_type: Option<&str>,
    ) -> Result<Vec<AnalyticsEvent>, RowQueryError>;

    /// Number of events of each type at or after `start`.
    async fn fetch_counts(&self, start: DateTime<Utc>) -> Result<Vec<EventCount>, CountQueryError>;
}

// what to do with the counts query's result
#[derive(Debug)]
pub enum CountsOutcome {
    Available(Vec<EventCount>),
    // the query failed, carry on as if nothing was counted
    Degraded(CountQueryError),
}

impl CountsOutcome {
    #[must_use]
    pub fn into_counts(self) -> Vec<EventCount> {
        match self {
            Self::Available(counts) => counts,
            Self::Degraded(_) => Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

#[derive(Debug)]
pub struct GatewayResponse {
    pub rows: Vec<AnalyticsEvent>,
    pub counts: CountsOutcome,
}

/// Runs both queries for `window` concurrently.
///
/// The event type filter narrows the rows only; counts always cover every
/// type in the window.
#[allow(clippy::missing_errors_doc)]
#[tracing::instrument(
    name = "Fetch analytics events",
    skip(store, now),
    fields(window = %window, window_label = window.label())
)]
pub async fn fetch(
    store: &dyn EventStore,
    window: TimeWindow,
    event_type: Option<&str>,
    now: DateTime<Utc>,
) -> Result<GatewayResponse, RowQueryError> {
    let start = window.start(now);

    // neither query depends on the other, so fire both and wait for the pair;
    // get_event_counts wants a concrete date, the epoch stands in for "all time"
    let (rows, counts) = tokio::join!(
        store.fetch_rows(start, event_type),
        store.fetch_counts(start.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)),
    );

    // no rows means nothing to show, bail out here
    let rows = rows.inspect_err(|e| {
        tracing::error!(error.cause_chain = ?e, "Failed to fetch analytics events");
    })?;

    // missing counts only zero out a few numbers, log it and keep going
    let counts = match counts {
        Ok(counts) => CountsOutcome::Available(counts),
        Err(e) => {
            tracing::warn!(
                error.cause_chain = ?e,
                "Failed to fetch event counts, continuing without them"
            );
            CountsOutcome::Degraded(e)
        }
    };

    Ok(GatewayResponse { rows, counts })
}
