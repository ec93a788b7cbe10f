//! Tier classification and change-audit workflow.
//!
//! Companies carry a cached tier that the classifier refreshes through three
//! entry points (bulk recompute, manual override, approve-suggested), each
//! transition recorded in an append-only audit log and fanned out to the
//! notification dispatcher. Read-side aggregations (review candidates,
//! distribution statistics, per-company history) live in the query service.

pub mod audit;
pub mod classifier;
pub mod domain;
pub mod query;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use audit::ChangeLogger;
pub use classifier::{classify, review_reason, ESTABLISHED_AFTER_MONTHS, HIGH_SPEND_THRESHOLD};
pub use domain::{
    normalize_notes, Company, CompanyId, NewTierChangeLog, Tier, TierChangeLog, TierChangeReason,
    UserAccount, UserId, UserRole,
};
pub use query::{
    ChangedByView, ReviewCandidate, TierDistribution, TierHistoryEntry, TierQueryService,
    TierStatistics, RECENT_CHANGES_WINDOW_DAYS,
};
pub use router::tier_router;
pub use service::{RecomputeSummary, TierChange, TierWorkflowError, TierWorkflowService};
pub use store::{
    NotificationDispatcher, NotificationKind, NotifyError, StoreError, TierNotification, TierStore,
};
