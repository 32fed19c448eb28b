// Stockpile type for resource inventories

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Resource, ResourceAmount};

/// Inventory of resources held by a player or a hub market
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stockpile {
    pub goods: BTreeMap<Resource, u32>,
}

impl Stockpile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: Resource, amount: u32) -> Self {
        self.add(ResourceAmount::new(kind, amount));
        self
    }

    pub fn add(&mut self, resource: ResourceAmount) {
        let held = self.goods.entry(resource.kind).or_insert(0);
        *held = held.saturating_add(resource.amount);
    }

    /// Removes up to the requested amount, returns what was actually removed
    pub fn remove(&mut self, resource: ResourceAmount) -> u32 {
        let held = self.goods.entry(resource.kind).or_insert(0);
        let removed = resource.amount.min(*held);
        *held -= removed;
        removed
    }

    pub fn get(&self, kind: Resource) -> u32 {
        self.goods.get(&kind).copied().unwrap_or(0)
    }

    /// Whether every entry of `cost` can be paid at once. Repeated kinds in
    /// the cost list are summed before comparing.
    pub fn has_at_least(&self, cost: &[ResourceAmount]) -> bool {
        let mut needed: BTreeMap<Resource, u64> = BTreeMap::new();
        for entry in cost {
            *needed.entry(entry.kind).or_insert(0) += u64::from(entry.amount);
        }
        needed
            .into_iter()
            .all(|(kind, amount)| u64::from(self.get(kind)) >= amount)
    }

    pub fn total(&self) -> u64 {
        self.goods.values().map(|&q| u64::from(q)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.goods.values().all(|&q| q == 0)
    }

    /// Non-zero entries
    pub fn amounts(&self) -> Vec<ResourceAmount> {
        self.goods
            .iter()
            .filter(|(_, qty)| **qty > 0)
            .map(|(kind, qty)| ResourceAmount::new(*kind, *qty))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_is_capped_by_stock() {
        let mut stock = Stockpile::new().with(Resource::Wood, 5);
        assert_eq!(stock.remove(ResourceAmount::new(Resource::Wood, 8)), 5);
        assert_eq!(stock.get(Resource::Wood), 0);
        assert!(stock.is_empty());
    }

    #[test]
    fn affordability_sums_repeated_kinds() {
        let stock = Stockpile::new().with(Resource::Wood, 5).with(Resource::Tools, 1);
        let cost = [
            ResourceAmount::new(Resource::Wood, 3),
            ResourceAmount::new(Resource::Wood, 3),
        ];
        assert!(!stock.has_at_least(&cost));
        assert!(stock.has_at_least(&cost[..1]));
        assert!(stock.has_at_least(&[]));
    }

    #[test]
    fn amounts_skip_empty_entries() {
        let mut stock = Stockpile::new().with(Resource::Fish, 2).with(Resource::Stone, 1);
        stock.remove(ResourceAmount::new(Resource::Stone, 1));
        assert_eq!(stock.amounts(), vec![ResourceAmount::new(Resource::Fish, 2)]);
        assert_eq!(stock.total(), 2);
    }
}
