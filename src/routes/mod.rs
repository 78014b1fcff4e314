mod analytics;
mod health_check;

pub use analytics::*;
pub use health_check::*;
