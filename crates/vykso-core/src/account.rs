//! Account records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::{AspectRatio, Tier, FREE_PLAN};
use crate::AccountId;

/// A Vykso account.
///
/// Tracks the credit balance (1 credit = 1 second of generated video), the
/// current plan name, and the tier/aspect-ratio derived from it.
///
/// `plan` is the authoritative source of the tier. `tier` and
/// `aspect_ratio` are cached derivations refreshed on every plan change so
/// queries don't re-parse the plan string; readers that need certainty use
/// [`Account::tier`], which re-derives from `plan` and wins on mismatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The identity-provider subject id.
    pub id: AccountId,

    /// Contact email, if known.
    pub email: Option<String>,

    /// Display name, if known.
    pub display_name: Option<String>,

    /// Credit balance. Never negative.
    pub credits: i64,

    /// Current plan name (`"free"` until a subscription exists).
    pub plan: String,

    /// Cached tier, derived from `plan`.
    pub tier: Tier,

    /// Cached aspect ratio, derived from `tier`.
    pub aspect_ratio: AspectRatio,

    /// Billing provider's customer reference, captured from webhooks.
    pub billing_customer_ref: Option<String>,

    /// Billing provider's subscription reference, captured from webhooks.
    pub billing_subscription_ref: Option<String>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account on the free plan with zero credits.
    ///
    /// The starting credit grant is applied by the caller as a ledger
    /// operation so the transaction log covers it.
    #[must_use]
    pub fn new(id: AccountId) -> Self {
        let now = Utc::now();
        let tier = Tier::classify(Some(FREE_PLAN));
        Self {
            id,
            email: None,
            display_name: None,
            credits: 0,
            plan: FREE_PLAN.to_string(),
            tier,
            aspect_ratio: tier.aspect_ratio(),
            billing_customer_ref: None,
            billing_subscription_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The account's tier, re-derived from the plan string.
    ///
    /// The cached `tier` field exists for query convenience; this is the
    /// authoritative answer if the two ever disagree.
    #[must_use]
    pub fn tier(&self) -> Tier {
        Tier::classify(Some(&self.plan))
    }

    /// Replace the plan and refresh the cached tier and aspect ratio.
    pub fn set_plan(&mut self, plan: impl Into<String>) {
        self.plan = plan.into();
        self.tier = Tier::classify(Some(&self.plan));
        self.aspect_ratio = self.tier.aspect_ratio();
        self.updated_at = Utc::now();
    }

    /// Whether the balance covers a debit of `amount`.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.credits >= amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_is_free_creator_with_zero_credits() {
        let account = Account::new(AccountId::generate());
        assert_eq!(account.credits, 0);
        assert_eq!(account.plan, "free");
        assert_eq!(account.tier, Tier::Creator);
        assert_eq!(account.aspect_ratio, AspectRatio::Portrait);
    }

    #[test]
    fn set_plan_refreshes_derived_fields() {
        let mut account = Account::new(AccountId::generate());

        account.set_plan("pro_pro");
        assert_eq!(account.tier, Tier::Professional);
        assert_eq!(account.aspect_ratio, AspectRatio::Landscape);

        account.set_plan("creator_basic");
        assert_eq!(account.tier, Tier::Creator);
        assert_eq!(account.aspect_ratio, AspectRatio::Portrait);
    }

    #[test]
    fn plan_wins_over_stale_cached_tier() {
        let mut account = Account::new(AccountId::generate());
        account.plan = "max_pro".to_string(); // cached tier left stale on purpose
        assert_eq!(account.tier, Tier::Creator);
        assert_eq!(account.tier(), Tier::Professional);
    }

    #[test]
    fn sufficient_credits_boundary() {
        let mut account = Account::new(AccountId::generate());
        account.credits = 10;
        assert!(account.has_sufficient_credits(10));
        assert!(!account.has_sufficient_credits(11));
    }
}
