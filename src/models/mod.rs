mod analytics;
pub mod events;
mod time_window;

pub use analytics::*;
pub use events::{AnalyticsEvent, EventCount, EventKind, SurveyType};
pub use time_window::TimeWindow;
