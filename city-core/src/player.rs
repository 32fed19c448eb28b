// The player: stockpile, population totals and promotion slots

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::collaborators::StockpileOwner;
use crate::hub::TownCenter;
use crate::stockpile::Stockpile;
use crate::types::{BuildingId, ResidentTier, Resource, ResourceAmount};

/// A residence changed tier: (residence, from, to)
pub type TierChange = (BuildingId, ResidentTier, ResidentTier);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Player {
    pub stockpile: Stockpile,
    /// Residents per tier across every hub
    pub population: BTreeMap<ResidentTier, u32>,
    /// Promotions into a tier the player may still grant
    pub promotion_slots: BTreeMap<ResidentTier, u32>,
    pub tier_changes: Vec<TierChange>,
}

impl Player {
    pub fn with_resource(mut self, kind: Resource, amount: u32) -> Self {
        self.stockpile.add(ResourceAmount::new(kind, amount));
        self
    }

    pub fn with_promotion_slots(mut self, tier: ResidentTier, slots: u32) -> Self {
        self.promotion_slots.insert(tier, slots);
        self
    }

    pub fn total_population(&self) -> u32 {
        self.population.values().sum()
    }

    /// Replaces the per-tier totals with the sum over `hubs`.
    pub fn sync_population<'a>(&mut self, hubs: impl IntoIterator<Item = &'a TownCenter>) {
        self.population.clear();
        for hub in hubs {
            for (tier, count) in &hub.population {
                *self.population.entry(*tier).or_insert(0) += count;
            }
        }
    }
}

impl StockpileOwner for Player {
    fn has_enough_resources(&self, cost: &[ResourceAmount]) -> bool {
        self.stockpile.has_at_least(cost)
    }

    fn remove_resource(&mut self, resource: ResourceAmount) {
        self.stockpile.remove(resource);
    }

    fn add_resource(&mut self, resource: ResourceAmount) {
        self.stockpile.add(resource);
    }

    fn population(&self, tier: ResidentTier) -> u32 {
        self.population.get(&tier).copied().unwrap_or(0)
    }

    fn available_promotions(&self, tier: ResidentTier) -> u32 {
        self.promotion_slots.get(&tier).copied().unwrap_or(0)
    }

    fn report_tier_change(&mut self, residence: BuildingId, from: ResidentTier, to: ResidentTier) {
        if let Some(slots) = self.promotion_slots.get_mut(&to) {
            *slots = slots.saturating_sub(1);
        }
        self.tier_changes.push((residence, from, to));
    }

    fn update_population(&mut self, from: ResidentTier, to: ResidentTier, residents: u32) {
        let left = self.population.entry(from).or_insert(0);
        *left = left.saturating_sub(residents);
        *self.population.entry(to).or_insert(0) += residents;
    }
}
