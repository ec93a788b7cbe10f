use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for companies held in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub String);

/// Identifier wrapper for user accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Closed tier classification, ordered `Tier1` (highest-value client) down to `Tier3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "TIER_1")]
    Tier1,
    #[serde(rename = "TIER_2")]
    Tier2,
    #[serde(rename = "TIER_3")]
    Tier3,
}

impl Tier {
    pub const fn label(self) -> &'static str {
        match self {
            Tier::Tier1 => "TIER_1",
            Tier::Tier2 => "TIER_2",
            Tier::Tier3 => "TIER_3",
        }
    }
}

/// Company snapshot as read from the store. The stored `tier` is a cached
/// projection of the classification rule, refreshed by recompute/override
/// rather than on every company write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub ad_spend: f64,
    pub tier: Tier,
    pub created_by: UserId,
}

/// Role taxonomy relevant to tier administration. Only executives and
/// managers may override or approve tier changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Ceo,
    Manager,
    TeamMember,
}

impl UserRole {
    pub const fn can_override_tier(self) -> bool {
        matches!(self, UserRole::Ceo | UserRole::Manager)
    }

    pub const fn label(self) -> &'static str {
        match self {
            UserRole::Ceo => "CEO",
            UserRole::Manager => "MANAGER",
            UserRole::TeamMember => "TEAM_MEMBER",
        }
    }
}

/// User account snapshot read for actor checks and history enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub role: UserRole,
}

/// Provenance of a tier transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierChangeReason {
    Automatic,
    ManualOverride,
}

/// Append-only audit record of one tier transition. Every record satisfies
/// `old_tier != new_tier`; no-op transitions are never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierChangeLog {
    pub id: String,
    pub company_id: CompanyId,
    pub old_tier: Tier,
    pub new_tier: Tier,
    pub reason: TierChangeReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a log row before the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTierChangeLog {
    pub company_id: CompanyId,
    pub old_tier: Tier,
    pub new_tier: Tier,
    pub reason: TierChangeReason,
    pub changed_by: Option<UserId>,
    pub notes: Option<String>,
}

/// Collapses empty and whitespace-only notes so the log carries a single
/// optional representation.
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|value| !value.trim().is_empty())
}
