//! A residential building and its growth model.
//!
//! Each tick a built residence runs, in order:
//! 1. satisfaction tracking (every `needs_interval` seconds), which may
//!    trigger a tier promotion,
//! 2. resident migration (every `residents_interval` seconds).

mod migration;
mod promotion;
mod satisfaction;

use std::sync::Arc;

pub use migration::MigrationStep;
pub use promotion::PromotionOutcome;
pub use satisfaction::SatisfactionSnapshot;

use satisfaction::Satisfaction;

use crate::building::BuildingData;
use crate::collaborators::{Neighbourhood, PopulationHub, SpatialQuery, StockpileOwner};
use crate::config::SimConfig;
use crate::rules::TierCatalog;
#[cfg(feature = "instrument")]
use crate::types::KeyToU64;
use crate::types::{BuildingCategory, BuildingId, Need, Resource, ResidentTier, ResourceAmount};

/// Elapsed-time accumulator firing once per period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cadence {
    period: f32,
    elapsed: f32,
}

impl Cadence {
    pub fn new(period: f32) -> Self {
        Self {
            period,
            elapsed: 0.0,
        }
    }

    /// Adds `dt`; when the period is reached, resets and returns true.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        if self.elapsed >= self.period {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }
}

/// Result of placing a residence on the map.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// Attached to a hub and reported its residents there
    Settled { hub: BuildingId },
    /// No hub in range: the build cost went back to the owner and the host
    /// should remove the residence
    Abandoned { refunded: Vec<ResourceAmount> },
}

/// What happened during one residence tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// New aggregate when satisfaction was updated this tick
    pub satisfaction: Option<f32>,
    pub promotion: Option<PromotionOutcome>,
    pub migration: Option<MigrationStep>,
}

pub struct Residence {
    building: BuildingId,
    tier: ResidentTier,
    residents: u32,
    max_residents: u32,
    is_built: bool,
    pub data: BuildingData,
    pub mesh: String,
    hub: Option<BuildingId>,
    satisfaction: Satisfaction,
    needs_timer: Cadence,
    residents_timer: Cadence,
    catalog: Arc<dyn TierCatalog>,
    config: Arc<SimConfig>,
}

impl std::fmt::Debug for Residence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Residence")
            .field("building", &self.building)
            .field("tier", &self.tier)
            .field("residents", &self.residents)
            .field("max_residents", &self.max_residents)
            .field("is_built", &self.is_built)
            .field("hub", &self.hub)
            .field("satisfaction", &self.satisfaction)
            .finish_non_exhaustive()
    }
}

impl Residence {
    /// Seeds one fully satisfied entry per requirement of `tier`.
    pub fn new(
        building: BuildingId,
        tier: ResidentTier,
        max_residents: u32,
        data: BuildingData,
        catalog: Arc<dyn TierCatalog>,
        config: Arc<SimConfig>,
    ) -> Self {
        let mut satisfaction = Satisfaction::default();
        if let Some(needs) = catalog.needs_for(tier) {
            satisfaction.seed(needs, true);
        }
        satisfaction.recompute_total();

        Self {
            building,
            tier,
            residents: 0,
            max_residents,
            is_built: false,
            data,
            mesh: String::new(),
            hub: None,
            satisfaction,
            needs_timer: Cadence::new(config.needs_interval),
            residents_timer: Cadence::new(config.residents_interval),
            catalog,
            config,
        }
    }

    /// Initial residents, capped at the maximum
    pub fn with_residents(mut self, residents: u32) -> Self {
        self.residents = residents.min(self.max_residents);
        self
    }

    pub fn building(&self) -> BuildingId {
        self.building
    }

    pub fn tier(&self) -> ResidentTier {
        self.tier
    }

    pub fn residents(&self) -> u32 {
        self.residents
    }

    pub fn max_residents(&self) -> u32 {
        self.max_residents
    }

    pub fn is_built(&self) -> bool {
        self.is_built
    }

    pub fn hub(&self) -> Option<BuildingId> {
        self.hub
    }

    pub fn total_satisfaction(&self) -> f32 {
        self.satisfaction.total()
    }

    /// Current satisfaction for one resource, 0 if it is not consumed here
    pub fn satisfaction(&self, resource: Resource) -> f32 {
        self.satisfaction.resource(resource)
    }

    pub fn snapshot(&self) -> SatisfactionSnapshot {
        self.satisfaction.snapshot()
    }

    // === Build ===

    /// Nearest hub within the search radius, if any
    pub fn locate_hub(&self, spatial: &dyn SpatialQuery) -> Option<BuildingId> {
        spatial
            .buildings_in_radius(
                self.building,
                BuildingCategory::TownCenter,
                self.config.need_search_radius,
            )
            .first()
            .copied()
    }

    /// Attaches to `hub` and reports the residents there. Without a hub the
    /// build cost is refunded and the residence stays unbuilt.
    pub fn on_build(
        &mut self,
        hub: Option<(BuildingId, &mut dyn PopulationHub)>,
        owner: Option<&mut dyn StockpileOwner>,
    ) -> BuildOutcome {
        let outcome = match hub {
            Some((hub_id, hub)) => {
                hub.update_population(self.tier, self.residents as i32);
                self.hub = Some(hub_id);
                self.is_built = true;
                BuildOutcome::Settled { hub: hub_id }
            }
            None => {
                let refunded = self.data.build_cost.clone();
                if let Some(owner) = owner {
                    for cost in &refunded {
                        owner.add_resource(*cost);
                    }
                }
                BuildOutcome::Abandoned { refunded }
            }
        };

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "build",
            residence = self.building.to_u64(),
            tier = self.tier.name(),
            settled = matches!(outcome, BuildOutcome::Settled { .. }),
        );

        outcome
    }

    // === Tick ===

    /// Advances both timers. Unbuilt residences do nothing.
    pub fn tick(&mut self, dt: f32, ctx: &mut Neighbourhood<'_>) -> TickReport {
        let mut report = TickReport::default();
        if !self.is_built {
            return report;
        }

        if self.needs_timer.advance(dt) {
            let (total, promotion) = self.update_satisfaction(ctx);
            report.satisfaction = Some(total);
            report.promotion = promotion;
        }
        if self.residents_timer.advance(dt) {
            report.migration = Some(self.move_residents(ctx));
        }
        report
    }

    /// One satisfaction cycle: resources, then needs, then the aggregate and
    /// the promotion check. Returns the aggregate and any promotion attempt.
    pub fn update_satisfaction(
        &mut self,
        ctx: &mut Neighbourhood<'_>,
    ) -> (f32, Option<PromotionOutcome>) {
        let hub_reached = self.satisfaction.need(Need::TownCenter);
        let hub = ctx.hub.as_deref();
        self.satisfaction.update_resources(self.config.satisfaction_step, |resource| {
            hub_reached && hub.is_some_and(|hub| hub.has_resource(resource))
        });

        let spatial = ctx.spatial;
        let origin = self.building;
        let radius = self.config.need_search_radius;
        self.satisfaction.refresh_needs(|need| {
            need.required_category()
                .map(|category| is_connected_to(spatial, origin, category, radius))
        });

        for _need in self.satisfaction.purge_untrackable() {
            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "purge",
                residence = self.building.to_u64(),
                need = _need.name(),
            );
        }

        self.satisfaction.recompute_total();
        let total = self.satisfaction.total();

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "satisfaction",
            residence = self.building.to_u64(),
            tier = self.tier.name(),
            total = total,
            residents = self.residents,
            tracked = self.satisfaction.len() as u64,
        );

        let promotion = self.promotion_rule(ctx).map(|rule| self.upgrade(rule, ctx));
        (total, promotion)
    }
}

/// Need test: the nearest building of `category` in range is reachable.
fn is_connected_to(
    spatial: &dyn SpatialQuery,
    origin: BuildingId,
    category: BuildingCategory,
    radius: f32,
) -> bool {
    spatial
        .buildings_in_radius(origin, category, radius)
        .first()
        .is_some_and(|&nearest| spatial.has_path(origin, nearest))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::{HashMap, HashSet};

    use slotmap::SlotMap;

    use super::*;
    use crate::building::PredefinedBuildingData;
    use crate::rules::RuleBook;

    /// Map where every category in `reachable` has one building in range
    /// connected by road, and `in_range_only` ones are in range but cut off.
    #[derive(Default)]
    pub struct FakeMap {
        pub reachable: HashSet<BuildingCategory>,
        pub in_range_only: HashSet<BuildingCategory>,
        ids: HashMap<BuildingCategory, BuildingId>,
    }

    impl FakeMap {
        pub fn reaching(categories: &[BuildingCategory]) -> Self {
            let mut keys: SlotMap<BuildingId, ()> = SlotMap::with_key();
            let ids = [
                BuildingCategory::TownCenter,
                BuildingCategory::Chapel,
                BuildingCategory::Residence,
                BuildingCategory::Production,
            ]
            .into_iter()
            .map(|c| (c, keys.insert(())))
            .collect();
            Self {
                reachable: categories.iter().copied().collect(),
                in_range_only: HashSet::new(),
                ids,
            }
        }

        pub fn id_of(&self, category: BuildingCategory) -> BuildingId {
            self.ids[&category]
        }
    }

    impl SpatialQuery for FakeMap {
        fn buildings_in_radius(
            &self,
            _origin: BuildingId,
            category: BuildingCategory,
            _radius: f32,
        ) -> Vec<BuildingId> {
            if self.reachable.contains(&category) || self.in_range_only.contains(&category) {
                vec![self.ids[&category]]
            } else {
                Vec::new()
            }
        }

        fn has_path(&self, _from: BuildingId, to: BuildingId) -> bool {
            self.reachable.iter().any(|c| self.ids[c] == to)
        }
    }

    /// Hub recording every population report
    #[derive(Default)]
    pub struct FakeHub {
        pub stocked: HashSet<Resource>,
        pub reports: Vec<(ResidentTier, i32)>,
    }

    impl FakeHub {
        pub fn stocking(resources: &[Resource]) -> Self {
            Self {
                stocked: resources.iter().copied().collect(),
                reports: Vec::new(),
            }
        }
    }

    impl PopulationHub for FakeHub {
        fn update_population(&mut self, tier: ResidentTier, delta: i32) {
            self.reports.push((tier, delta));
        }

        fn has_resource(&self, resource: Resource) -> bool {
            self.stocked.contains(&resource)
        }
    }

    pub fn residence(tier: ResidentTier, max_residents: u32) -> Residence {
        residence_with(tier, max_residents, SimConfig::default())
    }

    pub fn residence_with(tier: ResidentTier, max_residents: u32, config: SimConfig) -> Residence {
        let mut keys: SlotMap<BuildingId, ()> = SlotMap::with_key();
        let data = BuildingData::from_predefined(&PredefinedBuildingData::residence());
        let mut residence = Residence::new(
            keys.insert(()),
            tier,
            max_residents,
            data,
            Arc::new(RuleBook::standard()),
            Arc::new(config),
        );
        residence.is_built = true;
        residence
    }
}
