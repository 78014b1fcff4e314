//! Turns the raw event rows and per-type counts of one time window into the
//! dashboard metrics.
//!
//! Base numbers (visits, clicks, signups) come from the precomputed counts;
//! the rows are only scanned for what needs their properties or session ids.
//! Nothing here touches the database, so an empty `counts` slice (the counts
//! query failed) just zeroes the count-based figures.
mod steps;

use std::collections::{HashMap, HashSet};

use crate::models::events::{
    COMPANY_INTERESTED_CLICK, DIALOG_CLOSE, EMAIL_SIGNUP_CLICK, GOOGLE_SIGNUP_CLICK,
    HOME_PAGE_VISIT, RECOMMENDATIONS_PAGE_VISIT, SIGNUP_CLICK, SURVEY_COMPLETED,
    SURVEY_START_CLICK,
};
use crate::models::{
    AnalyticsEvent, AnalyticsStats, EventCount, EventKind, Percentage, RecommendationsMetrics,
    SignupMetrics, SurveyFunnelMetrics, SurveyType, SurveyTypeMetrics, round_half_up,
};

pub use steps::{compare_step_ids, order_steps, step_number, survey_steps};

/// event_type -> count, zero for anything the counts query didn't return
struct CountLookup<'a>(HashMap<&'a str, i64>);

impl<'a> CountLookup<'a> {
    fn new(counts: &'a [EventCount]) -> Self {
        let mut lookup = HashMap::with_capacity(counts.len());
        for count in counts {
            lookup.entry(count.event_type.as_str()).or_insert(count.count);
        }
        Self(lookup)
    }

    fn get(&self, event_type: &str) -> i64 {
        self.0.get(event_type).copied().unwrap_or(0)
    }
}

#[tracing::instrument(
    name = "Derive analytics metrics",
    skip(rows, counts),
    fields(rows = rows.len(), event_types = counts.len())
)]
#[must_use]
pub fn derive_metrics(rows: &[AnalyticsEvent], counts: &[EventCount]) -> AnalyticsStats {
    let lookup = CountLookup::new(counts);

    let survey_funnel = survey_funnel(&lookup);
    let survey_steps = survey_steps(rows, survey_funnel.started);

    let signup_clicks = lookup.get(SIGNUP_CLICK);
    let dialog_closes = lookup.get(DIALOG_CLOSE);

    AnalyticsStats {
        total_events: rows.len(),
        signup_clicks,
        dialog_closes,
        conversion_rate: legacy_conversion_rate(signup_clicks, dialog_closes),
        survey_types: survey_types(rows),
        recommendations: recommendations(rows, &lookup),
        signups: signups(&lookup),
        survey_funnel,
        survey_steps,
    }
}

fn survey_funnel(lookup: &CountLookup<'_>) -> SurveyFunnelMetrics {
    let visits = lookup.get(HOME_PAGE_VISIT);
    let started = lookup.get(SURVEY_START_CLICK);
    let completed = lookup.get(SURVEY_COMPLETED);

    SurveyFunnelMetrics {
        visits,
        started,
        completed,
        start_rate: Percentage::of(started, visits),
        completion_rate: Percentage::of(completed, started),
        overall_conversion_rate: Percentage::of(completed, visits),
    }
}

// the counts can't see inside properties, so this one has to walk the rows;
// anything that isn't text or image just doesn't get counted
fn survey_types(rows: &[AnalyticsEvent]) -> SurveyTypeMetrics {
    let (mut text, mut image) = (0, 0);
    for event in rows {
        match event.kind() {
            EventKind::SurveyTypeSelected {
                survey_type: Some(SurveyType::Text),
            } => text += 1,
            EventKind::SurveyTypeSelected {
                survey_type: Some(SurveyType::Image),
            } => image += 1,
            _ => {}
        }
    }

    SurveyTypeMetrics {
        text,
        image,
        total: text + image,
    }
}

fn recommendations(rows: &[AnalyticsEvent], lookup: &CountLookup<'_>) -> RecommendationsMetrics {
    let page_visits = lookup.get(RECOMMENDATIONS_PAGE_VISIT);
    let company_interest_clicks = lookup.get(COMPANY_INTERESTED_CLICK);

    // rates are per visitor, so collect distinct sessions; events without one are skipped
    let mut visit_sessions = HashSet::new();
    let mut interest_sessions = HashSet::new();
    for event in rows {
        let Some(session) = event.session() else {
            continue;
        };
        match event.kind() {
            EventKind::RecommendationsPageVisit => {
                visit_sessions.insert(session);
            }
            EventKind::CompanyInterestedClick => {
                interest_sessions.insert(session);
            }
            _ => {}
        }
    }

    let visit_sessions = i64::try_from(visit_sessions.len()).unwrap_or(i64::MAX);
    let interest_sessions = i64::try_from(interest_sessions.len()).unwrap_or(i64::MAX);

    // clicks per interested visitor, to one decimal place
    #[allow(clippy::cast_precision_loss)]
    let average_companies_per_user = if interest_sessions > 0 {
        round_half_up(company_interest_clicks as f64 / interest_sessions as f64 * 10.0) / 10.0
    } else {
        0.0
    };

    RecommendationsMetrics {
        page_visits,
        company_interest_clicks,
        company_interest_rate: Percentage::of(interest_sessions, visit_sessions),
        average_companies_per_user,
    }
}

fn signups(lookup: &CountLookup<'_>) -> SignupMetrics {
    let email_signups = lookup.get(EMAIL_SIGNUP_CLICK);
    let google_signups = lookup.get(GOOGLE_SIGNUP_CLICK);

    SignupMetrics {
        email_signups,
        google_signups,
        total_signups: email_signups + google_signups,
    }
}

// only meaningful once someone has closed the dialog: 5 clicks and 0 closes is 0%
fn legacy_conversion_rate(signup_clicks: i64, dialog_closes: i64) -> Percentage {
    if dialog_closes > 0 {
        Percentage::of(signup_clicks, signup_clicks + dialog_closes)
    } else {
        Percentage::default()
    }
}
