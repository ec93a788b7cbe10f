use chrono::{DateTime, Months, Utc};

use super::domain::Tier;

/// Relationships younger than this many whole months classify as still new.
pub const ESTABLISHED_AFTER_MONTHS: u32 = 3;

/// Ad spend strictly above this amount qualifies an established company for Tier 1.
pub const HIGH_SPEND_THRESHOLD: f64 = 2500.0;

/// Computes the tier a company should hold at `now`. Deterministic: identical
/// inputs with an identical `now` always yield the same tier.
///
/// Newness overrides spend: a company younger than three whole months is
/// `Tier2` regardless of ad spend. Exactly three months counts as
/// established, and spend of exactly 2500 is not high spend. Negative spend
/// is an upstream invariant violation and is not defended against here.
pub fn classify(start_date: DateTime<Utc>, ad_spend: f64, now: DateTime<Utc>) -> Tier {
    if !is_established(start_date, now) {
        return Tier::Tier2;
    }

    if ad_spend > HIGH_SPEND_THRESHOLD {
        Tier::Tier1
    } else {
        Tier::Tier3
    }
}

fn is_established(start_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match start_date.checked_add_months(Months::new(ESTABLISHED_AFTER_MONTHS)) {
        Some(threshold) => now >= threshold,
        // start_date close enough to the calendar maximum that three months
        // cannot elapse; the company cannot be established yet.
        None => false,
    }
}

/// Fixed reason template for a review candidate, selected by the classifier
/// branch that produced the suggestion.
pub const fn review_reason(suggested: Tier) -> &'static str {
    match suggested {
        Tier::Tier1 => "high spend qualifies for Tier 1",
        Tier::Tier2 => "still new",
        Tier::Tier3 => "established with low spend",
    }
}
