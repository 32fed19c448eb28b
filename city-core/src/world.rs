//! The host the residences live in: buildings on a flat map, roads between
//! them, town centers with their markets and carts, and the player.
//!
//! `World::tick` runs, in order:
//! 1. production in every building,
//! 2. cart dispatch from each town center to producers with stock,
//! 3. cart movement and move completions,
//! 4. every residence tick, with the map, its hub and the player lent to it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use slotmap::{SecondaryMap, SlotMap};

use crate::barrow::{Barrow, DeliveryStep, MoveResult, Trip};
use crate::building::{Building, BuildingData, PredefinedBuildingData};
use crate::collaborators::{Neighbourhood, PopulationHub, SpatialQuery, StockpileOwner};
use crate::config::SimConfig;
use crate::hub::TownCenter;
use crate::player::Player;
use crate::residence::{BuildOutcome, Residence, TickReport};
use crate::rules::{NeedsCatalog, RuleBook, RuleProvider};
use crate::types::{BarrowId, BuildingCategory, BuildingId, Position, ResidentTier};

/// Residents a house holds before any upgrade
pub const PEASANT_HOUSE_CAPACITY: u32 = 10;

// ============================================================================
// Roads
// ============================================================================

/// Undirected road links between buildings
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    links: HashMap<BuildingId, HashSet<BuildingId>>,
}

impl RoadNetwork {
    pub fn connect(&mut self, a: BuildingId, b: BuildingId) {
        if a == b {
            return;
        }
        self.links.entry(a).or_default().insert(b);
        self.links.entry(b).or_default().insert(a);
    }

    pub fn is_linked(&self, a: BuildingId, b: BuildingId) -> bool {
        self.links.get(&a).is_some_and(|links| links.contains(&b))
    }

    /// Breadth-first search over road links
    pub fn has_path(&self, from: BuildingId, to: BuildingId) -> bool {
        if from == to {
            return true;
        }
        let mut seen = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            let Some(links) = self.links.get(&current) else {
                continue;
            };
            for &next in links {
                if next == to {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }
}

/// Read-only view of the map answering residence queries
pub struct Spatial<'w> {
    pub buildings: &'w SlotMap<BuildingId, Building>,
    pub roads: &'w RoadNetwork,
}

impl SpatialQuery for Spatial<'_> {
    fn buildings_in_radius(
        &self,
        origin: BuildingId,
        category: BuildingCategory,
        radius: f32,
    ) -> Vec<BuildingId> {
        let Some(origin_building) = self.buildings.get(origin) else {
            return Vec::new();
        };
        let mut found: Vec<(f32, BuildingId)> = self
            .buildings
            .iter()
            .filter(|(id, building)| *id != origin && building.category == category)
            .map(|(id, building)| (origin_building.distance_to(building), id))
            .filter(|(dist, _)| *dist <= radius)
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        found.into_iter().map(|(_, id)| id).collect()
    }

    fn has_path(&self, from: BuildingId, to: BuildingId) -> bool {
        self.roads.has_path(from, to)
    }
}

// ============================================================================
// World
// ============================================================================

#[derive(Debug)]
pub struct World {
    pub tick: u64,
    pub player: Player,
    config: Arc<SimConfig>,
    rules: Arc<RuleBook>,
    buildings: SlotMap<BuildingId, Building>,
    roads: RoadNetwork,
    hubs: SecondaryMap<BuildingId, TownCenter>,
    residences: SecondaryMap<BuildingId, Residence>,
    barrows: SlotMap<BarrowId, Barrow>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(RuleBook::standard(), SimConfig::default())
    }
}

impl World {
    pub fn new(rules: RuleBook, config: SimConfig) -> Self {
        Self {
            tick: 0,
            player: Player::default(),
            config: Arc::new(config),
            rules: Arc::new(rules),
            buildings: SlotMap::with_key(),
            roads: RoadNetwork::default(),
            hubs: SecondaryMap::new(),
            residences: SecondaryMap::new(),
            barrows: SlotMap::with_key(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    pub fn spatial(&self) -> Spatial<'_> {
        Spatial {
            buildings: &self.buildings,
            roads: &self.roads,
        }
    }

    // === Buildings ===

    pub fn add_town_center(&mut self, position: Position) -> BuildingId {
        self.add_building(
            BuildingCategory::TownCenter,
            position,
            &PredefinedBuildingData::town_center(),
        )
    }

    /// Places a building. Town centers also get a hub with its own market.
    pub fn add_building(
        &mut self,
        category: BuildingCategory,
        position: Position,
        predefined: &PredefinedBuildingData,
    ) -> BuildingId {
        let building = Building::new(category, position, BuildingData::from_predefined(predefined));
        let id = self.buildings.insert(building);
        if category == BuildingCategory::TownCenter {
            self.hubs.insert(id, TownCenter::default());
        }
        id
    }

    /// Lays a road between two existing buildings
    pub fn connect(&mut self, a: BuildingId, b: BuildingId) -> bool {
        if !self.buildings.contains_key(a) || !self.buildings.contains_key(b) {
            return false;
        }
        self.roads.connect(a, b);
        true
    }

    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id)
    }

    pub fn building_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.get_mut(id)
    }

    pub fn buildings(&self) -> impl Iterator<Item = (BuildingId, &Building)> {
        self.buildings.iter()
    }

    pub fn hub(&self, id: BuildingId) -> Option<&TownCenter> {
        self.hubs.get(id)
    }

    pub fn hub_mut(&mut self, id: BuildingId) -> Option<&mut TownCenter> {
        self.hubs.get_mut(id)
    }

    pub fn hubs(&self) -> impl Iterator<Item = (BuildingId, &TownCenter)> {
        self.hubs.iter()
    }

    pub fn residence(&self, id: BuildingId) -> Option<&Residence> {
        self.residences.get(id)
    }

    pub fn residences(&self) -> impl Iterator<Item = (BuildingId, &Residence)> {
        self.residences.iter()
    }

    pub fn barrows(&self) -> impl Iterator<Item = (BarrowId, &Barrow)> {
        self.barrows.iter()
    }

    pub fn roads(&self) -> &RoadNetwork {
        &self.roads
    }

    // === Residences ===

    /// Player-placed house: charges the build cost, then settles it. `None`
    /// when the player cannot pay. An abandoned house is removed again and
    /// its id no longer resolves.
    pub fn place_residence(&mut self, position: Position) -> Option<(BuildingId, BuildOutcome)> {
        let cost = PredefinedBuildingData::residence().build_cost;
        if !self.player.has_enough_resources(&cost) {
            return None;
        }
        for entry in &cost {
            self.player.remove_resource(*entry);
        }
        Some(self.build_residence(position, ResidentTier::Peasant, 0, true))
    }

    /// Scenario house of any tier, free of charge and so never refunded.
    /// A tier the rule book has no needs for yields a house that tracks
    /// nothing and so never migrates or promotes.
    pub fn spawn_residence(
        &mut self,
        position: Position,
        tier: ResidentTier,
        residents: u32,
    ) -> (BuildingId, BuildOutcome) {
        if self.rules.needs_for(tier).is_none() {
            #[cfg(feature = "instrument")]
            tracing::warn!(target: "build", tier = tier.name(), "no needs defined for tier");
        }
        self.build_residence(position, tier, residents, false)
    }

    /// Residents a house of `tier` holds: the maximum of the rule that
    /// promotes into it, or the base capacity
    pub fn tier_capacity(&self, tier: ResidentTier) -> u32 {
        tier.upgrade_rule()
            .and_then(|name| self.rules.upgrade_rule(name))
            .map_or(PEASANT_HOUSE_CAPACITY, |rule| rule.new_maximum)
    }

    fn build_residence(
        &mut self,
        position: Position,
        tier: ResidentTier,
        residents: u32,
        charged: bool,
    ) -> (BuildingId, BuildOutcome) {
        let mut data = BuildingData::from_predefined(&PredefinedBuildingData::residence());
        let rule = tier
            .upgrade_rule()
            .and_then(|name| self.rules.upgrade_rule(name))
            .cloned();
        if let Some(rule) = &rule {
            data.name = rule.name.clone();
            data.icon = rule.icon.clone();
        }

        let id = self.buildings.insert(Building::new(
            BuildingCategory::Residence,
            position,
            data.clone(),
        ));
        let mut residence = Residence::new(
            id,
            tier,
            self.tier_capacity(tier),
            data,
            self.rules.clone(),
            self.config.clone(),
        )
        .with_residents(residents);
        if let Some(rule) = rule {
            residence.mesh = rule.mesh;
        }

        let spatial = Spatial {
            buildings: &self.buildings,
            roads: &self.roads,
        };
        let hub_id = residence.locate_hub(&spatial);
        let hub = hub_id.and_then(|hub_id| {
            self.hubs
                .get_mut(hub_id)
                .map(|hub| (hub_id, hub as &mut dyn PopulationHub))
        });
        let owner: Option<&mut dyn StockpileOwner> = if charged {
            Some(&mut self.player as &mut dyn StockpileOwner)
        } else {
            None
        };
        let outcome = residence.on_build(hub, owner);

        match outcome {
            BuildOutcome::Settled { .. } => {
                self.residences.insert(id, residence);
                self.player.sync_population(self.hubs.values());
            }
            BuildOutcome::Abandoned { .. } => {
                self.buildings.remove(id);
            }
        }
        (id, outcome)
    }

    // === Tick ===

    /// Advances the whole world by `dt` seconds. Returns one report per
    /// residence.
    pub fn tick(&mut self, dt: f32) -> Vec<(BuildingId, TickReport)> {
        self.tick += 1;

        for building in self.buildings.values_mut() {
            building.tick_production(dt);
        }
        self.dispatch_barrows();
        self.move_barrows(dt);
        self.tick_residences(dt)
    }

    /// Sends free carts to connected producers in each hub's radius that have
    /// stock and no cart on the way.
    fn dispatch_barrows(&mut self) {
        let mut claimed: HashSet<BuildingId> = HashSet::new();
        let mut trips = Vec::new();

        for (hub_id, hub) in self.hubs.iter() {
            let Some(home) = self.buildings.get(hub_id) else {
                continue;
            };
            let orders: Vec<Trip> = self
                .buildings
                .iter()
                .filter(|(id, building)| {
                    !building.barrow_on_the_way
                        && !claimed.contains(id)
                        && home.distance_to(building) <= home.data.radius
                })
                .filter_map(|(id, building)| {
                    let produced = building.data.produced_resource.filter(|r| !r.is_empty())?;
                    Some(Trip {
                        workplace: hub_id,
                        home: home.position,
                        target: id,
                        target_position: building.position,
                        resource: produced.kind,
                    })
                })
                .filter(|trip| self.roads.has_path(hub_id, trip.target))
                .take(hub.free_barrows() as usize)
                .collect();
            claimed.extend(orders.iter().map(|trip| trip.target));
            trips.extend(orders);
        }

        for trip in trips {
            self.send_barrow(trip);
        }
    }

    fn send_barrow(&mut self, trip: Trip) -> Option<BarrowId> {
        let hub = self.hubs.get_mut(trip.workplace)?;
        let target = self.buildings.get_mut(trip.target)?;
        let id = match hub.take_from_pool() {
            Some(id) if self.barrows.contains_key(id) => id,
            _ => self.barrows.insert_with_key(Barrow::new),
        };
        hub.increase_barrows_in_use();
        let barrow = self.barrows.get_mut(id)?;
        barrow.dispatch(trip, target);
        Some(id)
    }

    /// Straight-line movement. A cart whose road was cut is blocked.
    fn move_barrows(&mut self, dt: f32) {
        let speed = self.config.barrow_speed;
        let acceptance_radius = self.config.acceptance_radius;
        let mut dropped = Vec::new();

        for (id, barrow) in self.barrows.iter_mut() {
            if !barrow.is_active() {
                continue;
            }
            let (Some(workplace_id), Some(target_id)) = (barrow.workplace(), barrow.target())
            else {
                continue;
            };
            let result = if self.roads.has_path(workplace_id, target_id) {
                barrow.advance(dt, speed)
            } else {
                Some(MoveResult::Blocked)
            };
            let Some(result) = result else {
                continue;
            };

            let (Some(workplace), Some(supplier)) = (
                self.hubs.get_mut(workplace_id),
                self.buildings.get_mut(target_id),
            ) else {
                dropped.push(id);
                continue;
            };
            let step = barrow.on_move_completed(result, acceptance_radius, supplier, workplace);
            if let DeliveryStep::Finished { pooled: false, .. } = step {
                dropped.push(id);
            }
        }

        for id in dropped {
            self.barrows.remove(id);
        }
    }

    fn tick_residences(&mut self, dt: f32) -> Vec<(BuildingId, TickReport)> {
        let World {
            buildings,
            roads,
            hubs,
            residences,
            player,
            ..
        } = self;
        let spatial = Spatial {
            buildings: &*buildings,
            roads: &*roads,
        };

        let mut reports = Vec::with_capacity(residences.len());
        for (id, residence) in residences.iter_mut() {
            let hub = residence.hub().and_then(|hub_id| hubs.get_mut(hub_id));
            let mut ctx = Neighbourhood::new(&spatial).with_owner(&mut *player);
            if let Some(hub) = hub {
                ctx = ctx.with_hub(hub);
            }
            let report = residence.tick(dt, &mut ctx);
            player.sync_population(hubs.values());
            reports.push((id, report));
        }

        // promotions rename and re-skin the house
        for (id, report) in &reports {
            if !report.promotion.is_some_and(|p| p.is_promoted()) {
                continue;
            }
            if let (Some(building), Some(residence)) = (buildings.get_mut(*id), residences.get(*id)) {
                building.data = residence.data.clone();
            }
        }
        reports
    }
}
