use serde::{Serialize, Serializer};

use crate::models::{AnalyticsEvent, EventCount};

/// A whole-number percentage, rendered as `"<n>%"`.
///
/// Values are not clamped: inconsistent inputs (more completions than starts)
/// produce figures above 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percentage(i64);

impl Percentage {
    /// `part / whole * 100`, rounded half-up; zero when `whole` is zero.
    #[must_use]
    pub fn of(part: i64, whole: i64) -> Self {
        if whole <= 0 {
            return Self(0);
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let value = round_half_up(part as f64 / whole as f64 * 100.0) as i64;
        Self(value)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// halves round up: 12.5 -> 13
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyFunnelMetrics {
    pub visits: i64,
    pub started: i64,
    pub completed: i64,
    pub start_rate: Percentage,
    pub completion_rate: Percentage,
    pub overall_conversion_rate: Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyTypeMetrics {
    pub text: i64,
    pub image: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsMetrics {
    pub page_visits: i64,
    pub company_interest_clicks: i64,
    pub company_interest_rate: Percentage,
    #[serde(serialize_with = "serialize_tenths")]
    pub average_companies_per_user: f64,
}

// dashboards read `2`, not `2.0`, so whole values go out as integers
#[allow(
    clippy::cast_possible_truncation,
    clippy::float_cmp,
    clippy::trivially_copy_pass_by_ref
)]
fn serialize_tenths<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupMetrics {
    pub email_signups: i64,
    pub google_signups: i64,
    pub total_signups: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyStepMetric {
    pub id: String,
    pub count: i64,
    pub percentage: Percentage,
}

/// Every metric derived for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsStats {
    pub total_events: usize,
    // kept for older dashboards
    pub signup_clicks: i64,
    pub dialog_closes: i64,
    pub conversion_rate: Percentage,
    pub survey_funnel: SurveyFunnelMetrics,
    pub survey_types: SurveyTypeMetrics,
    pub recommendations: RecommendationsMetrics,
    pub signups: SignupMetrics,
    pub survey_steps: Vec<SurveyStepMetric>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub events: Vec<AnalyticsEvent>,
    pub event_counts: Vec<EventCount>,
    pub stats: AnalyticsStats,
}
