use actix_web::{HttpResponse, http::header::ContentType, web};
use anyhow::Context;
use chrono::Utc;

use crate::aggregation::derive_metrics;
use crate::configuration::AnalyticsSettings;
use crate::errors::AnalyticsError;
use crate::gateway::{EventStore, fetch};
use crate::models::{AnalyticsResponse, TimeWindow};
use crate::telemetry::spawn_blocking_with_tracing;

// empty values behave like missing ones, and a time range we don't know
// about means "all time", same as the dashboard's own fallback
#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    time_range: Option<String>,
    event_type: Option<String>,
}

impl AnalyticsQuery {
    fn window(&self, default: TimeWindow) -> TimeWindow {
        match self.time_range.as_deref() {
            None | Some("") => default,
            Some(value) => TimeWindow::try_from(value.to_string()).unwrap_or_else(|_| {
                tracing::debug!("Unrecognised time range {value:?}, using all time");
                TimeWindow::AllTime
            }),
        }
    }

    fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref().filter(|t| !t.is_empty())
    }
}

#[tracing::instrument(
    name = "Get analytics",
    skip(query, store, settings),
    fields(time_range = ?query.time_range, event_type = ?query.event_type)
)]
pub async fn get_analytics(
    query: web::Query<AnalyticsQuery>,
    store: web::Data<dyn EventStore>,
    settings: web::Data<AnalyticsSettings>,
) -> Result<HttpResponse, AnalyticsError> {
    let window = query.window(settings.default_time_range);

    let response = fetch(store.get_ref(), window, query.event_type(), Utc::now())
        .await
        .map_err(|e| AnalyticsError::QueryFailed(e.into()))?;

    let rows = response.rows;
    // a degraded counts query just hands us an empty list here
    let counts = response.counts.into_counts();

    // a panic while deriving surfaces as a JoinError rather than taking the worker down
    let (events, event_counts, stats) = spawn_blocking_with_tracing(move || {
        let stats = derive_metrics(&rows, &counts);
        (rows, counts, stats)
    })
    .await
    .context("Failed to derive analytics metrics")?;

    tracing::info!(
        "Derived analytics for {} ({} events, {} event types)",
        window.label(),
        events.len(),
        event_counts.len()
    );

    // serialize ourselves so a failure lands in UnexpectedError instead of a bare 500
    let body = serde_json::to_string(&AnalyticsResponse {
        events,
        event_counts,
        stats,
    })
    .context("Failed to serialize analytics response")?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(body))
}
