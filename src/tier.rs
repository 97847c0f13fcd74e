//! Scheduler tier selection for retried jobs.
//!
//! The workflow engine re-submits a failed job with `attempt` increased by
//! one and asks for `attempt * base_runtime` minutes. The tier is the one
//! with the tightest `MaxWall` that still covers the request, so jobs land
//! on the shortest queue that can hold them.

use crate::config::{JobsPolicy, TierTable};

/// Tier used when no tier table is declared or no tier is long enough.
pub const DEFAULT_TIER: &str = "long";

/// Name of the tier with the smallest `MaxWall >= attempt * base_runtime_minutes`.
/// Ties go to the tier declared first. Falls back to `DEFAULT_TIER`.
pub fn select_tier(attempt: u32, base_runtime_minutes: u32, tiers: Option<&TierTable>) -> &str {
    let requested = u64::from(attempt) * u64::from(base_runtime_minutes);

    let mut best: Option<(&str, u32)> = None;
    for (name, tier) in tiers.into_iter().flatten() {
        if u64::from(tier.max_wall) < requested {
            continue;
        }
        if best.map_or(true, |(_, max_wall)| tier.max_wall < max_wall) {
            best = Some((name.as_str(), tier.max_wall));
        }
    }

    best.map_or(DEFAULT_TIER, |(name, _)| name)
}

/// Scheduler fields of a tier, as handed to the workflow engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierResources {
    pub name: String,
    /// `None` when the tier is not declared in the table (fallback tier).
    pub max_wall: Option<u32>,
    /// Slurm QOS label. Defaults to the tier name.
    pub qos: String,
    pub partition: Option<String>,
}

/// Resolve a tier name to its engine fields.
pub fn tier_resources(name: &str, tiers: Option<&TierTable>) -> Option<TierResources> {
    let tier = tiers?.get(name)?;
    Some(TierResources {
        name: name.to_string(),
        max_wall: Some(tier.max_wall),
        qos: tier.qos.clone().unwrap_or_else(|| name.to_string()),
        partition: tier.partition.clone(),
    })
}

/// `select_tier` followed by `tier_resources`. The fallback tier resolves
/// to its bare name when the table doesn't declare it.
pub fn resources_for_attempt(attempt: u32, base_runtime_minutes: u32, tiers: Option<&TierTable>) -> TierResources {
    let name = select_tier(attempt, base_runtime_minutes, tiers);
    tier_resources(name, tiers).unwrap_or_else(|| TierResources {
        name: name.to_string(),
        max_wall: None,
        qos: name.to_string(),
        partition: None,
    })
}

impl JobsPolicy {
    pub fn select_tier(&self, attempt: u32, base_runtime_minutes: u32) -> &str {
        select_tier(attempt, base_runtime_minutes, self.tiers.as_ref())
    }

    pub fn resources_for_attempt(&self, attempt: u32, base_runtime_minutes: u32) -> TierResources {
        resources_for_attempt(attempt, base_runtime_minutes, self.tiers.as_ref())
    }
}
