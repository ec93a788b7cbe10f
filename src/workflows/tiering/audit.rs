use std::sync::Arc;

use super::domain::{CompanyId, NewTierChangeLog, Tier, TierChangeLog, TierChangeReason, UserId};
use super::store::{StoreError, TierStore};

/// Appends immutable audit records for tier transitions.
///
/// Callers only invoke this from a change branch, so `old_tier != new_tier`
/// holds for every row ever written. The write is not transactional with the
/// tier update that precedes it: if it fails, the tier change stays applied
/// with no audit record, and the error propagates unchanged.
pub struct ChangeLogger<S> {
    store: Arc<S>,
}

impl<S: TierStore> ChangeLogger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn record(
        &self,
        company_id: &CompanyId,
        old_tier: Tier,
        new_tier: Tier,
        reason: TierChangeReason,
        changed_by: Option<UserId>,
        notes: Option<String>,
    ) -> Result<TierChangeLog, StoreError> {
        debug_assert_ne!(old_tier, new_tier, "no-op transitions are never logged");

        self.store.create_log(NewTierChangeLog {
            company_id: company_id.clone(),
            old_tier,
            new_tier,
            reason,
            changed_by,
            notes,
        })
    }
}
