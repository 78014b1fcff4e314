use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::EventStore;
use crate::errors::{CountQueryError, RowQueryError};
use crate::models::{AnalyticsEvent, EventCount};

pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EventStore for PgEventStore {
    #[tracing::instrument(name = "Query analytics events", skip(self))]
    async fn fetch_rows(
        &self,
        start: Option<DateTime<Utc>>,
        event_type: Option<&str>,
    ) -> Result<Vec<AnalyticsEvent>, RowQueryError> {
        sqlx::query_as::<_, AnalyticsEvent>(
            r#"
            SELECT id, event_type, timestamp, session_id, properties
            FROM analytics_events
            WHERE ($1::timestamptz IS NULL OR timestamp >= $1)
              AND ($2::text IS NULL OR event_type = $2)
            ORDER BY timestamp DESC
            "#,
        )
        .bind(start)
        .bind(event_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RowQueryError(anyhow::anyhow!(e)))
    }

    // server-side GROUP BY, see migrations/*_create_analytics_events.sql
    #[tracing::instrument(name = "Query event counts", skip(self))]
    async fn fetch_counts(&self, start: DateTime<Utc>) -> Result<Vec<EventCount>, CountQueryError> {
        sqlx::query_as::<_, EventCount>(
            r#"
            SELECT event_type, count
            FROM get_event_counts($1)
            "#,
        )
        .bind(start)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CountQueryError(anyhow::anyhow!(e)))
    }
}
