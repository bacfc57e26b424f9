//! Plan names, tier classification, and the duration policy each tier
//! imposes on generation requests.
//!
//! The billing provider hands us free-form plan identifiers (`"max"`,
//! `"creator_basic"`, `"premium_pro_yearly"`, ...). The plan string is the
//! authoritative source of an account's tier; the classifier here is the
//! single place that string is interpreted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::job::GenerationModel;

/// The plan every account starts on before any subscription exists.
pub const FREE_PLAN: &str = "free";

/// Minimum selectable duration (seconds) for professional accounts.
pub const PROFESSIONAL_MIN_SECONDS: u32 = 6;

/// Maximum selectable duration (seconds) for professional accounts.
pub const PROFESSIONAL_MAX_SECONDS: u32 = 60;

/// Plan names that predate the `_pro` suffix convention but are still
/// professional-tier. Checked after interval-suffix stripping.
const LEGACY_PRO_PLANS: [&str; 4] = ["premium_pro", "pro_pro", "max_pro", "starter_pro"];

/// Billing-interval suffixes appended to plan names by the checkout flow.
const INTERVAL_SUFFIXES: [&str; 3] = ["_monthly", "_yearly", "_annual"];

/// An account's tier, derived from its plan name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Vertical, fixed-duration, short-form content.
    Creator,

    /// Horizontal, variable-duration, ad-oriented content.
    Professional,
}

impl Tier {
    /// Classify a plan name into a tier.
    ///
    /// A plan is professional iff its normalized name (lowercased, trimmed,
    /// with a single trailing billing-interval suffix removed) ends in
    /// `_pro`, or appears on the legacy allow-list. Everything else,
    /// including `None`, the empty string, and unrecognized names, is
    /// creator. Falling back to creator is the safe-default policy for
    /// unknown plans, not an error.
    #[must_use]
    pub fn classify(plan: Option<&str>) -> Self {
        let Some(plan) = plan else {
            return Self::Creator;
        };

        let normalized = normalize_plan(plan);
        if normalized.ends_with("_pro") || LEGACY_PRO_PLANS.contains(&normalized.as_str()) {
            Self::Professional
        } else {
            Self::Creator
        }
    }

    /// The aspect ratio mandated for this tier.
    #[must_use]
    pub const fn aspect_ratio(self) -> AspectRatio {
        match self {
            Self::Creator => AspectRatio::Portrait,
            Self::Professional => AspectRatio::Landscape,
        }
    }

    /// The duration rule this tier imposes for a given generation model.
    #[must_use]
    pub const fn duration_rule(self, model: GenerationModel) -> DurationRule {
        match self {
            Self::Creator => DurationRule::Fixed(model.fixed_duration_seconds()),
            Self::Professional => DurationRule::Range {
                min: PROFESSIONAL_MIN_SECONDS,
                max: PROFESSIONAL_MAX_SECONDS,
            },
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creator => write!(f, "creator"),
            Self::Professional => write!(f, "professional"),
        }
    }
}

/// Lowercase, trim, and strip at most one trailing interval suffix.
///
/// `"Premium_Pro_Yearly"` normalizes to `"premium_pro"`; `"max"` stays
/// `"max"`. Only one suffix is stripped so a pathological name like
/// `"x_yearly_annual"` is not over-normalized.
fn normalize_plan(plan: &str) -> String {
    let lowered = plan.trim().to_ascii_lowercase();
    for suffix in INTERVAL_SUFFIXES {
        if let Some(base) = lowered.strip_suffix(suffix) {
            return base.to_string();
        }
    }
    lowered
}

/// Video frame aspect ratio, fixed by tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 9:16 vertical, for short-form feeds.
    #[serde(rename = "9:16")]
    Portrait,

    /// 16:9 horizontal, for ads and long-form platforms.
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    /// The wire representation (`"9:16"` / `"16:9"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a tier constrains the requested duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationRule {
    /// The duration is fixed; client-requested values are overridden.
    Fixed(u32),

    /// The duration is client-selectable within an inclusive range.
    Range {
        /// Inclusive lower bound in seconds.
        min: u32,
        /// Inclusive upper bound in seconds.
        max: u32,
    },
}

/// Monthly credit grant for a subscription plan, used when a renewal
/// payment lands.
///
/// Grants follow the billing catalog: creator plans grant 100/200/300,
/// professional plans 600/1200/1800, with yearly/annual variants granting
/// the same as their monthly counterparts. Unknown plans grant nothing;
/// the webhook handler logs and moves on rather than failing the event.
#[must_use]
pub fn monthly_grant(plan: &str) -> i64 {
    match normalize_plan(plan).as_str() {
        "creator_basic" => 100,
        "creator_pro" => 200,
        "creator_max" => 300,
        "starter" => 600,
        "pro" => 1200,
        "max" => 1800,
        _ => 0,
    }
}
