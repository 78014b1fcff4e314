use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{AnalyticsEvent, EventKind, Percentage, SurveyStepMetric};

/// Per-step completion counts, in step order, as a share of survey starts.
#[must_use]
pub fn survey_steps(rows: &[AnalyticsEvent], started: i64) -> Vec<SurveyStepMetric> {
    // first-seen order is kept so that ties stay where the rows put them
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, i64> = HashMap::new();

    for event in rows {
        if let EventKind::SurveyStepCompleted { step_id: Some(step_id) } = event.kind() {
            match counts.get_mut(step_id) {
                Some(count) => *count += 1,
                None => {
                    counts.insert(step_id, 1);
                    order.push(step_id);
                }
            }
        }
    }

    // only the distinct ids get copied out of the rows
    let mut steps: Vec<SurveyStepMetric> = order
        .into_iter()
        .map(|id| {
            let count = counts.get(id).copied().unwrap_or_default();
            SurveyStepMetric {
                percentage: Percentage::of(count, started),
                id: id.to_string(),
                count,
            }
        })
        .collect();

    order_steps(&mut steps);
    steps
}

/// Sorts steps by the number after the last `_` in their id, falling back to
/// comparing the ids as text when either side has no number.
///
/// A list mixing numbered and unnumbered ids may not have a consistent order
/// (`c_1 < a_5`, `a_5 < b`, `b < c_1`). An insertion sort is used so those
/// lists still come out deterministic and a second pass leaves them alone.
pub fn order_steps(steps: &mut [SurveyStepMetric]) {
    for i in 1..steps.len() {
        let mut j = i;
        while j > 0 && compare_step_ids(&steps[j].id, &steps[j - 1].id) == Ordering::Less {
            steps.swap(j, j - 1);
            j -= 1;
        }
    }
}

#[must_use]
pub fn compare_step_ids(a: &str, b: &str) -> Ordering {
    match (step_number(a), step_number(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// The integer after the last `_` (or the whole id when there is none).
///
/// Reads a leading, optionally signed, run of digits the way `step_3` or
/// `step_3b` would be read by a person; an empty suffix counts as step 0.
#[must_use]
pub fn step_number(id: &str) -> Option<i64> {
    let suffix = id.rsplit('_').next().unwrap_or(id);
    if suffix.is_empty() {
        return Some(0);
    }

    let trimmed = suffix.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
