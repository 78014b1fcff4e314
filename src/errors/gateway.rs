// the row query is the only fatal failure at the gateway; a failed counts
// query is carried as `CountsOutcome::Degraded` instead
#[derive(thiserror::Error, Debug)]
#[error("Failed to query analytics events")]
pub struct RowQueryError(#[source] pub anyhow::Error);

#[derive(thiserror::Error, Debug)]
#[error("Failed to query event counts")]
pub struct CountQueryError(#[source] pub anyhow::Error);
