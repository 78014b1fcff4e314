//! Read side of the `analytics_events` table.
//!
//! [`fetch`] issues the row query and the per-type counts query for one
//! window. Only the row query is allowed to fail the request; the counts
//! query degrades to an empty set (see [`CountsOutcome`]).
mod postgres;
mod store;

pub use postgres::PgEventStore;
pub use store::{CountsOutcome, EventStore, GatewayResponse, fetch};
