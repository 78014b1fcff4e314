use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// event_type values written by the site's client
pub const HOME_PAGE_VISIT: &str = "home_page_visit";
pub const SURVEY_START_CLICK: &str = "survey_start_click";
pub const SURVEY_COMPLETED: &str = "survey_completed";
pub const SURVEY_TYPE_SELECTED: &str = "survey_type_selected";
pub const SURVEY_STEP_COMPLETED: &str = "survey_step_completed";
pub const RECOMMENDATIONS_PAGE_VISIT: &str = "recommendations_page_visit";
pub const COMPANY_INTERESTED_CLICK: &str = "company_interested_click";
pub const EMAIL_SIGNUP_CLICK: &str = "email_signup_click";
pub const GOOGLE_SIGNUP_CLICK: &str = "google_signup_click";
pub const SIGNUP_CLICK: &str = "signup_click";
pub const DIALOG_CLOSE: &str = "dialog_close";

/// A row of the `analytics_events` table, returned to callers as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
    pub properties: Value,
}

impl AnalyticsEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind<'_> {
        EventKind::classify(&self.event_type, &self.properties)
    }

    /// The session id, treating an empty string the same as no session.
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Server-side reduction: how many events of one type fall in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventCount {
    pub event_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyType {
    Text,
    Image,
}

impl SurveyType {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Typed view over an event's `event_type` and `properties`.
///
/// Only the properties the aggregator reads are lifted out; a missing,
/// empty or non-string property becomes `None`. Strings are borrowed from the
/// row, so classifying is just a match and a map lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind<'a> {
    HomePageVisit,
    SurveyStartClick,
    SurveyCompleted,
    SurveyTypeSelected { survey_type: Option<SurveyType> },
    SurveyStepCompleted { step_id: Option<&'a str> },
    RecommendationsPageVisit,
    CompanyInterestedClick,
    EmailSignupClick,
    GoogleSignupClick,
    SignupClick,
    DialogClose,
    Other(&'a str),
}

impl<'a> EventKind<'a> {
    #[must_use]
    pub fn classify(event_type: &'a str, properties: &'a Value) -> Self {
        match event_type {
            HOME_PAGE_VISIT => Self::HomePageVisit,
            SURVEY_START_CLICK => Self::SurveyStartClick,
            SURVEY_COMPLETED => Self::SurveyCompleted,
            SURVEY_TYPE_SELECTED => Self::SurveyTypeSelected {
                survey_type: string_property(properties, "surveyType").and_then(SurveyType::parse),
            },
            SURVEY_STEP_COMPLETED => Self::SurveyStepCompleted {
                step_id: string_property(properties, "stepId"),
            },
            RECOMMENDATIONS_PAGE_VISIT => Self::RecommendationsPageVisit,
            COMPANY_INTERESTED_CLICK => Self::CompanyInterestedClick,
            EMAIL_SIGNUP_CLICK => Self::EmailSignupClick,
            GOOGLE_SIGNUP_CLICK => Self::GoogleSignupClick,
            SIGNUP_CLICK => Self::SignupClick,
            DIALOG_CLOSE => Self::DialogClose,
            other => Self::Other(other),
        }
    }
}

fn string_property<'a>(properties: &'a Value, key: &str) -> Option<&'a str> {
    properties
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}
