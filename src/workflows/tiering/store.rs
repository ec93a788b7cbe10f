use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Company, CompanyId, NewTierChangeLog, Tier, TierChangeLog, UserAccount, UserId,
};

/// Document-store abstraction over the `companies`, `users`, and
/// `tier_change_logs` collections so the workflow can be exercised against
/// in-memory doubles as well as the real BaaS adapter.
pub trait TierStore: Send + Sync {
    /// All companies, in whatever order the store's list query returns them.
    fn find_companies(&self) -> Result<Vec<Company>, StoreError>;
    fn find_company_by_id(&self, id: &CompanyId) -> Result<Option<Company>, StoreError>;
    /// Writes the tier field only, returning the updated company.
    fn update_company_tier(&self, id: &CompanyId, tier: Tier) -> Result<Company, StoreError>;
    fn find_user_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, StoreError>;
    /// Appends one immutable log row; the store assigns id and created_at.
    fn create_log(&self, entry: NewTierChangeLog) -> Result<TierChangeLog, StoreError>;
    fn find_logs_for_company(&self, id: &CompanyId) -> Result<Vec<TierChangeLog>, StoreError>;
    fn count_logs_since(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Notification categories this workflow emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    TierChange,
}

/// Structured notification handed to the dispatcher for later delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierNotification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub scheduled_for: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
}

/// Outbound notification hook (e-mail/SMS adapters live behind this).
/// Fire-and-forget from the workflow's perspective: delivery happens later,
/// queueing failures propagate like any other step failure.
pub trait NotificationDispatcher: Send + Sync {
    fn notify(&self, notification: TierNotification) -> Result<(), NotifyError>;
}

/// Notification queueing error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
