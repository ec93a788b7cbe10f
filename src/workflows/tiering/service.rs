use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::audit::ChangeLogger;
use super::classifier;
use super::domain::{
    normalize_notes, Company, CompanyId, Tier, TierChangeReason, UserId, UserRole,
};
use super::store::{
    NotificationDispatcher, NotificationKind, NotifyError, StoreError, TierNotification, TierStore,
};

/// Note attached to tier changes applied through the approve entry point.
const APPROVAL_NOTE: &str = "approved based on updated criteria";

/// One applied transition reported by a bulk recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierChange {
    pub company_id: CompanyId,
    pub company_name: String,
    pub old_tier: Tier,
    pub new_tier: Tier,
}

/// Result of a bulk recompute run. `updated_count` always equals
/// `changes.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeSummary {
    pub total_companies: usize,
    pub updated_count: usize,
    pub changes: Vec<TierChange>,
}

/// Orchestrates classification, tier persistence, audit logging, and
/// notification. Stateless: each entry point is one request-scoped sequence
/// of store and notifier calls with no checkpointing and no locking beyond
/// what the store itself provides.
pub struct TierWorkflowService<S, N> {
    store: Arc<S>,
    logger: ChangeLogger<S>,
    notifier: Arc<N>,
}

impl<S, N> TierWorkflowService<S, N>
where
    S: TierStore + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        let logger = ChangeLogger::new(store.clone());
        Self {
            store,
            logger,
            notifier,
        }
    }

    /// Reclassifies every company and applies the suggestion wherever it
    /// differs from the stored tier. Companies are processed one at a time in
    /// store order; each change is one tier write, one audit row, and one
    /// notification to the company owner.
    ///
    /// Non-atomic: the first failing step aborts the batch, and changes
    /// already applied to earlier companies stay applied.
    pub fn recompute_all(&self) -> Result<RecomputeSummary, TierWorkflowError> {
        let companies = self.store.find_companies()?;
        let total_companies = companies.len();
        let now = Utc::now();

        let mut changes = Vec::new();
        for company in companies {
            let suggested = classifier::classify(company.start_date, company.ad_spend, now);
            if suggested == company.tier {
                continue;
            }

            self.store.update_company_tier(&company.id, suggested)?;
            self.logger.record(
                &company.id,
                company.tier,
                suggested,
                TierChangeReason::Automatic,
                None,
                None,
            )?;
            self.notifier.notify(TierNotification {
                user_id: company.created_by.clone(),
                kind: NotificationKind::TierChange,
                title: "Company tier updated".to_string(),
                message: format!(
                    "{} moved from {} to {} in the scheduled tier review",
                    company.name,
                    company.tier.label(),
                    suggested.label()
                ),
                scheduled_for: now,
                company_id: Some(company.id.clone()),
            })?;

            changes.push(TierChange {
                company_id: company.id,
                company_name: company.name,
                old_tier: company.tier,
                new_tier: suggested,
            });
        }

        let updated_count = changes.len();
        info!(total_companies, updated_count, "tier recompute finished");

        Ok(RecomputeSummary {
            total_companies,
            updated_count,
            changes,
        })
    }

    /// Sets a company's tier by administrative decision.
    ///
    /// The actor's role is checked before anything else is touched; setting
    /// the tier a company already holds is rejected rather than silently
    /// accepted. On success the owner is notified unless the actor owns the
    /// company, and the actor always receives a confirmation.
    pub fn override_tier(
        &self,
        company_id: &CompanyId,
        new_tier: Tier,
        actor_id: &UserId,
        notes: Option<String>,
    ) -> Result<Company, TierWorkflowError> {
        let actor = self
            .store
            .find_user_by_id(actor_id)?
            .ok_or(TierWorkflowError::ActorNotFound)?;
        if !actor.role.can_override_tier() {
            return Err(TierWorkflowError::Permission { role: actor.role });
        }

        let company = self
            .store
            .find_company_by_id(company_id)?
            .ok_or(TierWorkflowError::CompanyNotFound)?;
        if new_tier == company.tier {
            return Err(TierWorkflowError::NoOp { tier: new_tier });
        }

        let updated = self.store.update_company_tier(company_id, new_tier)?;
        self.logger.record(
            company_id,
            company.tier,
            new_tier,
            TierChangeReason::ManualOverride,
            Some(actor.id.clone()),
            normalize_notes(notes),
        )?;

        let now = Utc::now();
        if company.created_by != actor.id {
            self.notifier.notify(TierNotification {
                user_id: company.created_by.clone(),
                kind: NotificationKind::TierChange,
                title: "Company tier changed".to_string(),
                message: format!(
                    "{} moved {} from {} to {}",
                    actor.username,
                    company.name,
                    company.tier.label(),
                    new_tier.label()
                ),
                scheduled_for: now,
                company_id: Some(company.id.clone()),
            })?;
        }
        self.notifier.notify(TierNotification {
            user_id: actor.id.clone(),
            kind: NotificationKind::TierChange,
            title: "Tier override applied".to_string(),
            message: format!(
                "{} is now {} (was {})",
                company.name,
                new_tier.label(),
                company.tier.label()
            ),
            scheduled_for: now,
            company_id: Some(company.id.clone()),
        })?;

        info!(
            company = %company.id.0,
            actor = %actor.id.0,
            old_tier = company.tier.label(),
            new_tier = new_tier.label(),
            "tier override applied"
        );

        Ok(updated)
    }

    /// Applies the classifier's current suggestion for a company as a manual
    /// override by the approving actor. Identical log shape to
    /// [`Self::override_tier`]; only the source of the new tier differs.
    pub fn approve_suggested(
        &self,
        company_id: &CompanyId,
        actor_id: &UserId,
    ) -> Result<Company, TierWorkflowError> {
        let company = self
            .store
            .find_company_by_id(company_id)?
            .ok_or(TierWorkflowError::CompanyNotFound)?;
        let suggested = classifier::classify(company.start_date, company.ad_spend, Utc::now());

        self.override_tier(
            company_id,
            suggested,
            actor_id,
            Some(APPROVAL_NOTE.to_string()),
        )
    }

    /// Role check used by controllers to gate the override UI.
    pub fn can_actor_override(&self, actor_id: &UserId) -> Result<bool, TierWorkflowError> {
        let actor = self
            .store
            .find_user_by_id(actor_id)?
            .ok_or(TierWorkflowError::ActorNotFound)?;
        Ok(actor.role.can_override_tier())
    }
}

/// Error raised by the tier workflow.
#[derive(Debug, thiserror::Error)]
pub enum TierWorkflowError {
    #[error("company not found")]
    CompanyNotFound,
    #[error("actor not found")]
    ActorNotFound,
    #[error("role {} may not change company tiers", role.label())]
    Permission { role: UserRole },
    #[error("company already holds {}", tier.label())]
    NoOp { tier: Tier },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}
