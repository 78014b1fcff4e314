use actix_cors::Cors;
use actix_web::{App, HttpServer, dev::Server, http, web, web::Data};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::configuration::{AnalyticsSettings, CorsSettings, DatabaseSettings, Settings};
use crate::gateway::{EventStore, PgEventStore};
use crate::routes::{get_analytics, health_check};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    #[allow(clippy::missing_errors_doc)]
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        // lazy pool: nothing connects until the first request comes in
        let connection_pool = get_connection_pool(&configuration.database);
        let store: Arc<dyn EventStore> = Arc::new(PgEventStore::new(connection_pool));

        Self::build_with_store(configuration, store).await
    }

    // same server, reading events from whatever `store` is handed in
    #[allow(clippy::missing_errors_doc)]
    pub async fn build_with_store(
        configuration: Settings,
        store: Arc<dyn EventStore>,
    ) -> Result<Self, anyhow::Error> {
        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port,
        );

        let listener = TcpListener::bind(address)?;
        // port 0 in tests, so ask the listener what we actually got
        let port = listener.local_addr()?.port();
        let server = run(listener, store, configuration.analytics, configuration.cors)?;

        Ok(Self { port, server })
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[allow(clippy::missing_errors_doc)]
    // only return when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

fn run(
    listener: TcpListener,
    store: Arc<dyn EventStore>,
    analytics: AnalyticsSettings,
    cors: CorsSettings,
) -> Result<Server, anyhow::Error> {
    // Data::from keeps the trait object, handlers pull it out as web::Data<dyn EventStore>
    let store: Data<dyn EventStore> = Data::from(store);
    let analytics = Data::new(analytics);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors_policy(&cors))
            .route("/health_check", web::get().to(health_check))
            // auth middleware can wrap this scope later, the route itself doesn't care
            .service(
                web::scope("/api/admin")
                    .route("/analytics", web::get().to(get_analytics)),
            )
            .app_data(store.clone())
            .app_data(analytics.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

// the dashboard only ever reads
fn cors_policy(cors: &CorsSettings) -> Cors {
    cors.allowed_origins
        .iter()
        .fold(Cors::default(), |policy, origin| policy.allowed_origin(origin))
        .allowed_methods(vec!["GET"])
        .allowed_headers(vec![http::header::ACCEPT, http::header::CONTENT_TYPE])
        .max_age(cors.max_age)
}

#[must_use]
pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(configuration.connect_options())
}
