// Per-residence satisfaction bookkeeping

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::rules::TierNeeds;
use crate::types::{Need, Resource};

/// Read-only copy of a residence's satisfaction state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct SatisfactionSnapshot {
    pub resources: BTreeMap<Resource, f32>,
    pub needs: BTreeMap<Need, bool>,
    pub total: f32,
}

/// Resource satisfaction in [0, 1], need satisfaction as met/unmet, and the
/// mean of both. Starts fully satisfied.
#[derive(Debug, Clone)]
pub(crate) struct Satisfaction {
    resources: BTreeMap<Resource, f32>,
    needs: BTreeMap<Need, bool>,
    total: f32,
}

impl Default for Satisfaction {
    fn default() -> Self {
        Self {
            resources: BTreeMap::new(),
            needs: BTreeMap::new(),
            total: 1.0,
        }
    }
}

impl Satisfaction {
    /// Adds entries for every requirement of `tier_needs` not tracked yet.
    /// Existing entries keep their value. Needs that cannot be tested are
    /// skipped. Returns how many entries were added.
    pub fn seed(&mut self, tier_needs: &TierNeeds, satisfied: bool) -> usize {
        let initial = if satisfied { 1.0 } else { 0.0 };
        let mut added = 0;
        for resource in &tier_needs.consumptions {
            if !self.resources.contains_key(resource) {
                self.resources.insert(*resource, initial);
                added += 1;
            }
        }
        for need in tier_needs.needs.iter().filter(|n| n.is_trackable()) {
            if !self.needs.contains_key(need) {
                self.needs.insert(*need, satisfied);
                added += 1;
            }
        }
        added
    }

    /// Moves every resource one `step` towards 1 when `supplied` says so,
    /// towards 0 otherwise.
    pub fn update_resources(&mut self, step: f32, mut supplied: impl FnMut(Resource) -> bool) {
        for (resource, value) in self.resources.iter_mut() {
            *value = if supplied(*resource) {
                (*value + step).min(1.0)
            } else {
                (*value - step).max(0.0)
            };
        }
    }

    /// Re-evaluates every tracked need. `test` returns `None` for needs it
    /// cannot evaluate; those keep their value until purged.
    pub fn refresh_needs(&mut self, mut test: impl FnMut(Need) -> Option<bool>) {
        for (need, met) in self.needs.iter_mut() {
            if let Some(now) = test(*need) {
                *met = now;
            }
        }
    }

    /// Drops needs no building can satisfy. Returns the dropped keys.
    pub fn purge_untrackable(&mut self) -> Vec<Need> {
        let purged: Vec<Need> = self
            .needs
            .keys()
            .copied()
            .filter(|need| !need.is_trackable())
            .collect();
        for need in &purged {
            self.needs.remove(need);
        }
        purged
    }

    /// Recomputes the mean over all entries. With nothing tracked the
    /// previous total is kept and `None` returned.
    pub fn recompute_total(&mut self) -> Option<f32> {
        let count = self.resources.len() + self.needs.len();
        if count == 0 {
            return None;
        }
        let sum: f32 = self.resources.values().sum::<f32>()
            + self.needs.values().filter(|met| **met).count() as f32;
        self.total = (sum / count as f32).clamp(0.0, 1.0);
        Some(self.total)
    }

    pub fn total(&self) -> f32 {
        self.total
    }

    /// 0 for resources not tracked
    pub fn resource(&self, resource: Resource) -> f32 {
        self.resources.get(&resource).copied().unwrap_or(0.0)
    }

    /// Unmet when not tracked
    pub fn need(&self, need: Need) -> bool {
        self.needs.get(&need).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.resources.len() + self.needs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> SatisfactionSnapshot {
        SatisfactionSnapshot {
            resources: self.resources.clone(),
            needs: self.needs.clone(),
            total: self.total,
        }
    }
}
