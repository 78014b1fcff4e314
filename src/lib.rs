pub mod aggregation;
pub mod configuration;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod routes;
pub mod startup;
pub mod telemetry;
