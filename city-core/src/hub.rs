// Town center state: population register, market stock and the cart pool

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::barrow::Workplace;
use crate::collaborators::PopulationHub;
use crate::stockpile::Stockpile;
use crate::types::{BarrowId, Resource, ResidentTier, ResourceAmount};

const DEFAULT_MAX_BARROWS: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TownCenter {
    pub population: BTreeMap<ResidentTier, u32>,
    pub market: Stockpile,
    pub barrows_in_use: u32,
    pub max_barrows: u32,
    /// Idle carts waiting for the next order
    pool: Vec<BarrowId>,
}

impl Default for TownCenter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BARROWS)
    }
}

impl TownCenter {
    pub fn new(max_barrows: u32) -> Self {
        Self {
            population: BTreeMap::new(),
            market: Stockpile::new(),
            barrows_in_use: 0,
            max_barrows,
            pool: Vec::new(),
        }
    }

    pub fn with_stock(mut self, kind: Resource, amount: u32) -> Self {
        self.market.add(ResourceAmount::new(kind, amount));
        self
    }

    pub fn residents(&self) -> u32 {
        self.population.values().sum()
    }

    pub fn free_barrows(&self) -> u32 {
        self.max_barrows.saturating_sub(self.barrows_in_use)
    }

    /// An idle cart, if any. `None` means a new cart must be created.
    pub fn take_from_pool(&mut self) -> Option<BarrowId> {
        self.pool.pop()
    }

    pub fn increase_barrows_in_use(&mut self) {
        self.barrows_in_use += 1;
    }

    pub fn pooled(&self) -> usize {
        self.pool.len()
    }
}

impl PopulationHub for TownCenter {
    fn update_population(&mut self, tier: ResidentTier, delta: i32) {
        let count = self.population.entry(tier).or_insert(0);
        *count = count.saturating_add_signed(delta);
    }

    fn has_resource(&self, resource: Resource) -> bool {
        self.market.get(resource) > 0
    }
}

impl Workplace for TownCenter {
    fn receive_resource(&mut self, resource: ResourceAmount) -> u32 {
        self.market.add(resource);
        resource.amount
    }

    fn decrease_barrows_in_use(&mut self) {
        self.barrows_in_use = self.barrows_in_use.saturating_sub(1);
    }

    fn try_returning_to_pool(&mut self, barrow: BarrowId) -> bool {
        if self.pool.len() >= self.max_barrows as usize || self.pool.contains(&barrow) {
            return false;
        }
        self.pool.push(barrow);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn population_never_goes_negative() {
        let mut hub = TownCenter::default();
        hub.update_population(ResidentTier::Peasant, 3);
        hub.update_population(ResidentTier::Peasant, -5);
        assert_eq!(hub.population[&ResidentTier::Peasant], 0);
        assert_eq!(hub.residents(), 0);
    }

    #[test]
    fn market_stock_answers_resource_queries() {
        let mut hub = TownCenter::default().with_stock(Resource::Fish, 1);
        assert!(hub.has_resource(Resource::Fish));
        assert!(!hub.has_resource(Resource::Cider));
        hub.receive_resource(ResourceAmount::new(Resource::Cider, 2));
        assert!(hub.has_resource(Resource::Cider));
    }

    #[test]
    fn pool_holds_at_most_max_barrows() {
        let mut keys: SlotMap<BarrowId, ()> = SlotMap::with_key();
        let mut hub = TownCenter::new(1);
        let first = keys.insert(());
        let second = keys.insert(());

        assert!(hub.try_returning_to_pool(first));
        assert!(!hub.try_returning_to_pool(second));
        assert_eq!(hub.take_from_pool(), Some(first));
        assert_eq!(hub.take_from_pool(), None);
    }

    #[test]
    fn carts_in_use_are_bounded_below() {
        let mut hub = TownCenter::new(2);
        hub.increase_barrows_in_use();
        assert_eq!(hub.free_barrows(), 1);
        hub.decrease_barrows_in_use();
        hub.decrease_barrows_in_use();
        assert_eq!(hub.barrows_in_use, 0);
    }
}
