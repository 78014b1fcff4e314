mod analytics;
mod gateway;

pub use analytics::*;
pub use gateway::*;
