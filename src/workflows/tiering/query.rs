use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use super::classifier;
use super::domain::{CompanyId, Tier, TierChangeLog, UserId};
use super::store::{StoreError, TierStore};

/// Log rows at most this many days old count as recent in the statistics
/// view. The boundary is inclusive at exactly seven days ago.
pub const RECENT_CHANGES_WINDOW_DAYS: i64 = 7;

/// A company whose stored tier disagrees with the classifier's current
/// suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewCandidate {
    pub id: CompanyId,
    pub name: String,
    pub tier: Tier,
    pub suggested_tier: Tier,
    pub reason: &'static str,
}

/// Company counts per stored tier. All three keys are always present; a tier
/// with zero members reports zero rather than being omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDistribution {
    #[serde(rename = "TIER_1")]
    pub tier_1: usize,
    #[serde(rename = "TIER_2")]
    pub tier_2: usize,
    #[serde(rename = "TIER_3")]
    pub tier_3: usize,
}

impl TierDistribution {
    fn bump(&mut self, tier: Tier) {
        match tier {
            Tier::Tier1 => self.tier_1 += 1,
            Tier::Tier2 => self.tier_2 += 1,
            Tier::Tier3 => self.tier_3 += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.tier_1 + self.tier_2 + self.tier_3
    }
}

/// Aggregate view over companies and the change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStatistics {
    pub distribution: TierDistribution,
    pub recent_changes: u64,
    pub total_companies: usize,
}

/// The changing user, resolved for history display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedByView {
    pub id: UserId,
    pub username: String,
}

/// One history row: the log record plus the resolved actor when present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierHistoryEntry {
    #[serde(flatten)]
    pub log: TierChangeLog,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_by_user: Option<ChangedByView>,
}

/// Read-only aggregation over companies and tier change logs. Shares the
/// classifier with the workflow engine so review and recompute never
/// disagree on a suggestion.
pub struct TierQueryService<S> {
    store: Arc<S>,
}

impl<S: TierStore + 'static> TierQueryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Companies whose stored tier differs from the current suggestion, each
    /// annotated with the reason template of the classifier branch that fired.
    pub fn companies_needing_review(&self) -> Result<Vec<ReviewCandidate>, StoreError> {
        let companies = self.store.find_companies()?;
        let now = Utc::now();

        let candidates = companies
            .into_iter()
            .filter_map(|company| {
                let suggested = classifier::classify(company.start_date, company.ad_spend, now);
                if suggested == company.tier {
                    return None;
                }
                Some(ReviewCandidate {
                    id: company.id,
                    name: company.name,
                    tier: company.tier,
                    suggested_tier: suggested,
                    reason: classifier::review_reason(suggested),
                })
            })
            .collect();

        Ok(candidates)
    }

    /// Distribution of stored tiers, the count of log rows from the last
    /// seven days, and the company total. The distribution always sums to
    /// `total_companies`.
    pub fn tier_statistics(&self) -> Result<TierStatistics, StoreError> {
        let companies = self.store.find_companies()?;
        let total_companies = companies.len();

        let mut distribution = TierDistribution::default();
        for company in &companies {
            distribution.bump(company.tier);
        }

        let cutoff = Utc::now() - Duration::days(RECENT_CHANGES_WINDOW_DAYS);
        let recent_changes = self.store.count_logs_since(cutoff)?;

        Ok(TierStatistics {
            distribution,
            recent_changes,
            total_companies,
        })
    }

    /// Full change history for a company, newest first, each row enriched
    /// with the changing user when one is recorded and still resolvable.
    /// A company with no logged transitions yields an empty list.
    pub fn tier_history(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<TierHistoryEntry>, StoreError> {
        let mut logs = self.store.find_logs_for_company(company_id)?;
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut entries = Vec::with_capacity(logs.len());
        for log in logs {
            let changed_by_user = match &log.changed_by {
                Some(user_id) => self
                    .store
                    .find_user_by_id(user_id)?
                    .map(|user| ChangedByView {
                        id: user.id,
                        username: user.username,
                    }),
                None => None,
            };
            entries.push(TierHistoryEntry {
                log,
                changed_by_user,
            });
        }

        Ok(entries)
    }
}
