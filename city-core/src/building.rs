// Building records and per-building production

use serde::{Deserialize, Serialize};

use crate::types::{BuildingCategory, Position, Resource, ResourceAmount, distance};

/// Designer-authored defaults for a building type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredefinedBuildingData {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub build_cost: Vec<ResourceAmount>,
    #[serde(default)]
    pub max_stored_resources: u32,
    #[serde(default)]
    pub needed_resource_1: Option<Resource>,
    #[serde(default)]
    pub needed_resource_2: Option<Resource>,
    #[serde(default)]
    pub produced_resource: Option<Resource>,
    /// Seconds per produced unit; 0 means the building produces nothing
    #[serde(default)]
    pub production_time: f32,
    #[serde(default)]
    pub radius: f32,
    #[serde(default)]
    pub upkeep: u32,
}

impl PredefinedBuildingData {
    pub fn residence() -> Self {
        Self {
            name: "Peasant House".to_string(),
            icon: "icons/peasant_house".to_string(),
            build_cost: vec![ResourceAmount::new(Resource::Wood, 3)],
            max_stored_resources: 0,
            needed_resource_1: None,
            needed_resource_2: None,
            produced_resource: None,
            production_time: 60.0,
            radius: 0.0,
            upkeep: 0,
        }
    }

    pub fn town_center() -> Self {
        Self {
            name: "Town Center".to_string(),
            icon: "icons/town_center".to_string(),
            build_cost: vec![ResourceAmount::new(Resource::Wood, 10)],
            max_stored_resources: 0,
            needed_resource_1: None,
            needed_resource_2: None,
            produced_resource: None,
            production_time: 0.0,
            radius: 2000.0,
            upkeep: 5,
        }
    }

    pub fn chapel() -> Self {
        Self {
            name: "Chapel".to_string(),
            icon: "icons/chapel".to_string(),
            build_cost: vec![
                ResourceAmount::new(Resource::Wood, 4),
                ResourceAmount::new(Resource::Stone, 2),
            ],
            radius: 1200.0,
            upkeep: 2,
            ..Self::production("Chapel", None, 0.0)
        }
    }

    /// A producer of `resource` storing up to 8 units
    pub fn production(name: &str, resource: Option<Resource>, production_time: f32) -> Self {
        Self {
            name: name.to_string(),
            icon: String::new(),
            build_cost: vec![ResourceAmount::new(Resource::Wood, 2)],
            max_stored_resources: 8,
            needed_resource_1: None,
            needed_resource_2: None,
            produced_resource: resource,
            production_time,
            radius: 600.0,
            upkeep: 1,
        }
    }
}

/// Live per-building data. Resource slots start empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingData {
    pub name: String,
    pub icon: String,
    pub build_cost: Vec<ResourceAmount>,
    pub max_stored_resources: u32,
    pub needed_resource_1: Option<ResourceAmount>,
    pub needed_resource_2: Option<ResourceAmount>,
    pub produced_resource: Option<ResourceAmount>,
    pub production_time: f32,
    pub radius: f32,
    pub upkeep: u32,
}

impl BuildingData {
    pub fn from_predefined(predefined: &PredefinedBuildingData) -> Self {
        Self {
            name: predefined.name.clone(),
            icon: predefined.icon.clone(),
            build_cost: predefined.build_cost.clone(),
            max_stored_resources: predefined.max_stored_resources,
            needed_resource_1: predefined.needed_resource_1.map(ResourceAmount::empty),
            needed_resource_2: predefined.needed_resource_2.map(ResourceAmount::empty),
            produced_resource: predefined.produced_resource.map(ResourceAmount::empty),
            production_time: predefined.production_time,
            radius: predefined.radius,
            upkeep: predefined.upkeep,
        }
    }
}

/// A placed building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub category: BuildingCategory,
    pub position: Position,
    pub data: BuildingData,
    /// A delivery cart is already heading here
    pub barrow_on_the_way: bool,
    production_elapsed: f32,
}

impl Building {
    pub fn new(category: BuildingCategory, position: Position, data: BuildingData) -> Self {
        Self {
            category,
            position,
            data,
            barrow_on_the_way: false,
            production_elapsed: 0.0,
        }
    }

    pub fn distance_to(&self, other: &Building) -> f32 {
        distance(self.position, other.position)
    }

    /// Advance production; returns true when a unit was produced this call.
    /// Production pauses while storage is full.
    pub fn tick_production(&mut self, dt: f32) -> bool {
        let period = self.data.production_time;
        let max_stored = self.data.max_stored_resources;
        let Some(produced) = self.data.produced_resource.as_mut() else {
            return false;
        };
        if period <= 0.0 || produced.amount >= max_stored {
            return false;
        }

        self.production_elapsed += dt;
        if self.production_elapsed < period {
            return false;
        }
        self.production_elapsed = 0.0;
        produced.amount += 1;
        true
    }

    /// Stored amount of `kind` across the building's resource slots
    pub fn stored(&self, kind: Resource) -> u32 {
        self.slots()
            .filter(|slot| slot.kind == kind)
            .map(|slot| slot.amount)
            .sum()
    }

    /// Hands out everything stored of `kind`. The result is empty when the
    /// building holds none.
    pub fn hand_out_resource(&mut self, kind: Resource) -> ResourceAmount {
        let mut handed = ResourceAmount::empty(kind);
        for slot in self.slots_mut().filter(|slot| slot.kind == kind) {
            handed.amount += slot.amount;
            slot.amount = 0;
        }
        handed
    }

    /// Stores a delivery into the matching needed-resource slot, capped by
    /// `max_stored_resources`. Returns the amount accepted.
    pub fn receive_resource(&mut self, resource: ResourceAmount) -> u32 {
        let cap = self.data.max_stored_resources;
        let slot = [
            self.data.needed_resource_1.as_mut(),
            self.data.needed_resource_2.as_mut(),
        ]
        .into_iter()
        .flatten()
        .find(|slot| slot.kind == resource.kind);

        match slot {
            Some(slot) => {
                let accepted = resource.amount.min(cap.saturating_sub(slot.amount));
                slot.amount += accepted;
                accepted
            }
            None => 0,
        }
    }

    fn slots(&self) -> impl Iterator<Item = &ResourceAmount> {
        [
            self.data.needed_resource_1.as_ref(),
            self.data.needed_resource_2.as_ref(),
            self.data.produced_resource.as_ref(),
        ]
        .into_iter()
        .flatten()
    }

    fn slots_mut(&mut self) -> impl Iterator<Item = &mut ResourceAmount> {
        [
            self.data.needed_resource_1.as_mut(),
            self.data.needed_resource_2.as_mut(),
            self.data.produced_resource.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}
