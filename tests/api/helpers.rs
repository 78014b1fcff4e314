use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

use survey_analytics::{
    configuration::{DatabaseSettings, Settings, get_configuration},
    errors::{CountQueryError, RowQueryError},
    gateway::EventStore,
    models::{AnalyticsEvent, EventCount},
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};

// ensure the `tracing` subscriber is only initialized once using `LazyLock`
static TRACING: LazyLock<()> = LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

// stands in for the events table; counts are computed the same way
// get_event_counts computes them
#[derive(Default)]
pub struct InMemoryEventStore {
    pub events: Vec<AnalyticsEvent>,
    pub fail_rows: bool,
    pub fail_counts: bool,
}

impl InMemoryEventStore {
    pub fn with_events(events: Vec<AnalyticsEvent>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn fetch_rows(
        &self,
        start: Option<DateTime<Utc>>,
        event_type: Option<&str>,
    ) -> Result<Vec<AnalyticsEvent>, RowQueryError> {
        if self.fail_rows {
            return Err(RowQueryError(anyhow::anyhow!("connection refused")));
        }

        let mut rows: Vec<AnalyticsEvent> = self
            .events
            .iter()
            .filter(|e| start.is_none_or(|start| e.timestamp >= start))
            .filter(|e| event_type.is_none_or(|t| e.event_type == t))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }

    async fn fetch_counts(&self, start: DateTime<Utc>) -> Result<Vec<EventCount>, CountQueryError> {
        if self.fail_counts {
            return Err(CountQueryError(anyhow::anyhow!(
                "function get_event_counts does not exist"
            )));
        }

        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for event in self.events.iter().filter(|e| e.timestamp >= start) {
            *counts.entry(event.event_type.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(event_type, count)| EventCount {
                event_type: event_type.to_string(),
                count,
            })
            .collect())
    }
}

pub fn event(event_type: &str, age: Duration) -> AnalyticsEvent {
    AnalyticsEvent {
        id: Uuid::new_v4(),
        event_type: event_type.to_string(),
        timestamp: Utc::now() - age,
        session_id: None,
        properties: serde_json::json!({}),
    }
}

pub fn session_event(event_type: &str, session_id: &str, age: Duration) -> AnalyticsEvent {
    AnalyticsEvent {
        session_id: Some(session_id.to_string()),
        ..event(event_type, age)
    }
}

pub fn event_with(
    event_type: &str,
    properties: serde_json::Value,
    age: Duration,
) -> AnalyticsEvent {
    AnalyticsEvent {
        properties,
        ..event(event_type, age)
    }
}

pub fn repeat(n: usize, make: impl Fn() -> AnalyticsEvent) -> Vec<AnalyticsEvent> {
    (0..n).map(|_| make()).collect()
}

pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn health_check(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/health_check", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    // query values here are plain tokens, no escaping needed
    pub async fn get_analytics(&self, query: &[(&str, &str)]) -> reqwest::Response {
        let query = query
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        self.api_client
            .get(format!("{}/api/admin/analytics?{}", &self.address, query))
            .send()
            .await
            .expect("Failed to get analytics.")
    }

    pub async fn get_analytics_json(&self, query: &[(&str, &str)]) -> serde_json::Value {
        let response = self.get_analytics(query).await;
        assert_eq!(response.status().as_u16(), 200);
        response
            .json()
            .await
            .expect("Failed to parse analytics json")
    }
}

fn test_configuration() -> Settings {
    let mut c = get_configuration().expect("Failed to read configuration.");
    // a random OS port and a fresh database per test
    c.application.port = 0;
    c.database.database_name = Uuid::new_v4().to_string();
    c
}

fn test_app(application: Application) -> TestApp {
    let application_port = application.port();
    // launch as background task
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        api_client: reqwest::Client::new(),
    }
}

// most tests don't need postgres, the in-memory store is enough to drive the
// aggregation end to end
pub async fn spawn_app(store: InMemoryEventStore) -> TestApp {
    LazyLock::force(&TRACING);

    let application = Application::build_with_store(test_configuration(), Arc::new(store))
        .await
        .expect("Failed to build application.");

    test_app(application)
}

// the real thing: PgEventStore on a throwaway database, seeded with `events`
pub async fn spawn_app_with_database(events: &[AnalyticsEvent]) -> TestApp {
    LazyLock::force(&TRACING);

    let configuration = test_configuration();

    // create and migrate the database
    let pool = configure_database(&configuration.database).await;
    insert_events(&pool, events).await;

    let application = Application::build(configuration)
        .await
        .expect("Failed to build application.");

    test_app(application)
}

// creates a uniquely named database, runs the migrations against it and
// hands back a pool for seeding
pub async fn spawn_database() -> PgPool {
    LazyLock::force(&TRACING);

    configure_database(&test_configuration().database).await
}

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let maintenance_settings = DatabaseSettings {
        database_name: "postgres".to_string(),
        username: "postgres".to_string(),
        password: SecretString::new("password".into()),
        ..config.clone()
    };

    let mut connection = PgConnection::connect_with(&maintenance_settings.connect_options())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect_with(config.connect_options())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");

    connection_pool
}

// the site's client writes rows like this one, we only ever read them
pub async fn insert_events(pool: &PgPool, events: &[AnalyticsEvent]) {
    for event in events {
        sqlx::query(
            r#"
            INSERT INTO analytics_events (id, event_type, timestamp, session_id, properties)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.id)
        .bind(&event.event_type)
        .bind(event.timestamp)
        .bind(&event.session_id)
        .bind(&event.properties)
        .execute(pool)
        .await
        .expect("Failed to insert analytics event.");
    }
}
