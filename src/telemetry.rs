use tokio::task::JoinHandle;
use tracing::{Subscriber, subscriber::set_global_default};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, fmt::MakeWriter, layer::SubscriberExt};

// builds the subscriber the service logs through: bunyan JSON lines written to `sink`
// (stdout in main, a sink in tests unless TEST_LOG is set)
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    // RUST_LOG wins if it's set, otherwise fall back to whatever level we were handed
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        // drop anything below the filter level first
        .with(env_filter)
        // keeps span fields around so the derive/query spans show up on every line
        .with(JsonStorageLayer)
        // and finally write them out
        .with(formatting_layer)
}

/// # Panics
/// can only be called once per process, a second call panics on the logger
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    // sqlx and actix still log through `log`, route those into tracing as well
    LogTracer::init().expect("Failed to set logger");
    set_global_default(subscriber).expect("Failed to set subscriber");
}

// metric derivation is plain CPU work, so it goes to the blocking pool;
// carrying the span over keeps its log lines attached to the request
pub fn spawn_blocking_with_tracing<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let current_span = tracing::Span::current();
    // enter the caller's span on the worker thread for as long as `f` runs
    tokio::task::spawn_blocking(move || current_span.in_scope(f))
}
