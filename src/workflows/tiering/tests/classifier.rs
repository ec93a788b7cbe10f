use chrono::{Duration, TimeZone, Utc};

use crate::workflows::tiering::classifier::{classify, review_reason, HIGH_SPEND_THRESHOLD};
use crate::workflows::tiering::domain::Tier;

fn established_start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

#[test]
fn repeated_calls_with_identical_inputs_agree() {
    let start = established_start();
    let now = start + Duration::days(200);

    let first = classify(start, 3100.0, now);
    let second = classify(start, 3100.0, now);

    assert_eq!(first, second);
    assert_eq!(first, Tier::Tier1);
}

#[test]
fn young_company_is_tier_two_regardless_of_spend() {
    let start = established_start();
    let now = start + Duration::days(10);

    assert_eq!(classify(start, 50_000.0, now), Tier::Tier2);
    assert_eq!(classify(start, 0.0, now), Tier::Tier2);
}

#[test]
fn exactly_three_months_counts_as_established() {
    let start = established_start();
    // Jan 15 + 3 months = Apr 15, same time of day.
    let now = Utc
        .with_ymd_and_hms(2026, 4, 15, 9, 30, 0)
        .single()
        .expect("valid timestamp");

    assert_eq!(classify(start, 9_999.0, now), Tier::Tier1);
}

#[test]
fn just_under_three_months_is_still_new() {
    let start = established_start();
    let now = Utc
        .with_ymd_and_hms(2026, 4, 15, 9, 29, 59)
        .single()
        .expect("valid timestamp");

    assert_eq!(classify(start, 9_999.0, now), Tier::Tier2);
}

#[test]
fn spend_boundary_belongs_to_the_low_spend_branch() {
    let start = established_start();
    let now = start + Duration::days(365);

    assert_eq!(classify(start, HIGH_SPEND_THRESHOLD, now), Tier::Tier3);
    assert_eq!(classify(start, HIGH_SPEND_THRESHOLD + 0.01, now), Tier::Tier1);
}

#[test]
fn established_low_spend_is_tier_three() {
    let start = established_start();
    let now = start + Duration::days(365);

    assert_eq!(classify(start, 0.0, now), Tier::Tier3);
    assert_eq!(classify(start, 1_200.0, now), Tier::Tier3);
}

#[test]
fn review_reasons_match_classifier_branches() {
    assert_eq!(review_reason(Tier::Tier1), "high spend qualifies for Tier 1");
    assert_eq!(review_reason(Tier::Tier2), "still new");
    assert_eq!(review_reason(Tier::Tier3), "established with low spend");
}
