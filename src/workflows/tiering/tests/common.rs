use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::workflows::tiering::domain::{
    Company, CompanyId, NewTierChangeLog, Tier, TierChangeLog, UserAccount, UserId, UserRole,
};
use crate::workflows::tiering::query::TierQueryService;
use crate::workflows::tiering::service::TierWorkflowService;
use crate::workflows::tiering::store::{
    NotificationDispatcher, NotifyError, StoreError, TierNotification, TierStore,
};

pub(super) fn ceo() -> UserAccount {
    UserAccount {
        id: UserId("admin1".to_string()),
        username: "harriet".to_string(),
        role: UserRole::Ceo,
    }
}

pub(super) fn manager() -> UserAccount {
    UserAccount {
        id: UserId("manager1".to_string()),
        username: "devon".to_string(),
        role: UserRole::Manager,
    }
}

pub(super) fn team_member() -> UserAccount {
    UserAccount {
        id: UserId("user1".to_string()),
        username: "sam".to_string(),
        role: UserRole::TeamMember,
    }
}

pub(super) fn company(
    id: &str,
    name: &str,
    days_old: i64,
    ad_spend: f64,
    tier: Tier,
    created_by: &UserAccount,
) -> Company {
    Company {
        id: CompanyId(id.to_string()),
        name: name.to_string(),
        start_date: Utc::now() - Duration::days(days_old),
        ad_spend,
        tier,
        created_by: created_by.id.clone(),
    }
}

/// Store double preserving insertion order for `find_companies`, with an
/// optional knob to fail the tier update for one company so batch abort
/// behavior can be observed.
#[derive(Default)]
pub(super) struct MemoryStore {
    companies: Mutex<Vec<Company>>,
    users: Mutex<HashMap<String, UserAccount>>,
    logs: Mutex<Vec<TierChangeLog>>,
    sequence: AtomicU64,
    fail_update_for: Mutex<Option<CompanyId>>,
}

impl MemoryStore {
    pub(super) fn add_company(&self, company: Company) {
        self.companies
            .lock()
            .expect("company mutex poisoned")
            .push(company);
    }

    pub(super) fn add_user(&self, user: UserAccount) {
        self.users
            .lock()
            .expect("user mutex poisoned")
            .insert(user.id.0.clone(), user);
    }

    /// Inserts a pre-built log row, bypassing store-assigned timestamps.
    pub(super) fn push_log(&self, log: TierChangeLog) {
        self.logs.lock().expect("log mutex poisoned").push(log);
    }

    pub(super) fn fail_update_for(&self, id: &CompanyId) {
        *self.fail_update_for.lock().expect("knob mutex poisoned") = Some(id.clone());
    }

    pub(super) fn companies(&self) -> Vec<Company> {
        self.companies
            .lock()
            .expect("company mutex poisoned")
            .clone()
    }

    pub(super) fn company(&self, id: &CompanyId) -> Company {
        self.companies()
            .into_iter()
            .find(|company| company.id == *id)
            .expect("company present")
    }

    pub(super) fn logs(&self) -> Vec<TierChangeLog> {
        self.logs.lock().expect("log mutex poisoned").clone()
    }
}

impl TierStore for MemoryStore {
    fn find_companies(&self) -> Result<Vec<Company>, StoreError> {
        Ok(self.companies())
    }

    fn find_company_by_id(&self, id: &CompanyId) -> Result<Option<Company>, StoreError> {
        Ok(self
            .companies()
            .into_iter()
            .find(|company| company.id == *id))
    }

    fn update_company_tier(&self, id: &CompanyId, tier: Tier) -> Result<Company, StoreError> {
        if self
            .fail_update_for
            .lock()
            .expect("knob mutex poisoned")
            .as_ref()
            == Some(id)
        {
            return Err(StoreError::Unavailable("update rejected".to_string()));
        }

        let mut guard = self.companies.lock().expect("company mutex poisoned");
        let company = guard
            .iter_mut()
            .find(|company| company.id == *id)
            .ok_or(StoreError::NotFound)?;
        company.tier = tier;
        Ok(company.clone())
    }

    fn find_user_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .users
            .lock()
            .expect("user mutex poisoned")
            .get(&id.0)
            .cloned())
    }

    fn create_log(&self, entry: NewTierChangeLog) -> Result<TierChangeLog, StoreError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let log = TierChangeLog {
            id: format!("log-{sequence:06}"),
            company_id: entry.company_id,
            old_tier: entry.old_tier,
            new_tier: entry.new_tier,
            reason: entry.reason,
            changed_by: entry.changed_by,
            notes: entry.notes,
            created_at: Utc::now(),
        };
        self.push_log(log.clone());
        Ok(log)
    }

    fn find_logs_for_company(&self, id: &CompanyId) -> Result<Vec<TierChangeLog>, StoreError> {
        Ok(self
            .logs()
            .into_iter()
            .filter(|log| log.company_id == *id)
            .collect())
    }

    fn count_logs_since(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(self
            .logs()
            .iter()
            .filter(|log| log.created_at >= cutoff)
            .count() as u64)
    }
}

/// Store double where every operation fails.
pub(super) struct UnavailableStore;

impl TierStore for UnavailableStore {
    fn find_companies(&self) -> Result<Vec<Company>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn find_company_by_id(&self, _id: &CompanyId) -> Result<Option<Company>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn update_company_tier(&self, _id: &CompanyId, _tier: Tier) -> Result<Company, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn find_user_by_id(&self, _id: &UserId) -> Result<Option<UserAccount>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn create_log(&self, _entry: NewTierChangeLog) -> Result<TierChangeLog, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn find_logs_for_company(&self, _id: &CompanyId) -> Result<Vec<TierChangeLog>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn count_logs_since(&self, _cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    sent: Mutex<Vec<TierNotification>>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<TierNotification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationDispatcher for MemoryNotifier {
    fn notify(&self, notification: TierNotification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Notifier double where queueing always fails.
pub(super) struct FailingNotifier;

impl NotificationDispatcher for FailingNotifier {
    fn notify(&self, _notification: TierNotification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("queue offline".to_string()))
    }
}

pub(super) fn build_services() -> (
    TierWorkflowService<MemoryStore, MemoryNotifier>,
    TierQueryService<MemoryStore>,
    Arc<MemoryStore>,
    Arc<MemoryNotifier>,
) {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let workflow = TierWorkflowService::new(store.clone(), notifier.clone());
    let query = TierQueryService::new(store.clone());
    (workflow, query, store, notifier)
}
