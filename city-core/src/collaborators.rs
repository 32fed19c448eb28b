//! Capabilities a residence calls into but never implements. The host world
//! supplies them each tick; tests supply fakes.

use crate::types::{BuildingCategory, BuildingId, Resource, ResidentTier, ResourceAmount};

/// The player whose stockpile pays for promotions and who hears about them.
pub trait StockpileOwner {
    fn has_enough_resources(&self, cost: &[ResourceAmount]) -> bool;
    fn remove_resource(&mut self, resource: ResourceAmount);
    fn add_resource(&mut self, resource: ResourceAmount);

    /// Residents of `tier` across all of the owner's hubs
    fn population(&self, tier: ResidentTier) -> u32;
    /// Promotions into `tier` the owner may still grant
    fn available_promotions(&self, tier: ResidentTier) -> u32;

    fn report_tier_change(&mut self, residence: BuildingId, from: ResidentTier, to: ResidentTier);
    /// `residents` moved from `from` to `to`
    fn update_population(&mut self, from: ResidentTier, to: ResidentTier, residents: u32);
}

/// The town center a residence belongs to.
pub trait PopulationHub {
    fn update_population(&mut self, tier: ResidentTier, delta: i32);
    fn has_resource(&self, resource: Resource) -> bool;
}

/// Map queries answered by the host.
pub trait SpatialQuery {
    /// Buildings of `category` within `radius` of `origin`, nearest first.
    fn buildings_in_radius(
        &self,
        origin: BuildingId,
        category: BuildingCategory,
        radius: f32,
    ) -> Vec<BuildingId>;

    /// Whether a traversable path connects two buildings.
    fn has_path(&self, from: BuildingId, to: BuildingId) -> bool;
}

/// Collaborators handed to a residence for one tick.
pub struct Neighbourhood<'a> {
    pub spatial: &'a dyn SpatialQuery,
    pub hub: Option<&'a mut dyn PopulationHub>,
    pub owner: Option<&'a mut dyn StockpileOwner>,
}

impl<'a> Neighbourhood<'a> {
    pub fn new(spatial: &'a dyn SpatialQuery) -> Self {
        Self {
            spatial,
            hub: None,
            owner: None,
        }
    }

    pub fn with_hub(mut self, hub: &'a mut dyn PopulationHub) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn with_owner(mut self, owner: &'a mut dyn StockpileOwner) -> Self {
        self.owner = Some(owner);
        self
    }
}
