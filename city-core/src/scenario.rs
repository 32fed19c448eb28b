//! Starting layouts: a JSON format for custom maps and the built-in demo.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::building::PredefinedBuildingData;
use crate::config::SimConfig;
use crate::error::DataError;
use crate::player::Player;
use crate::residence::BuildOutcome;
use crate::rules::{NeedsCatalog, RuleBook, RuleBookData};
use crate::types::{BuildingCategory, BuildingId, Position, Resource, ResidentTier, ResourceAmount};
use crate::world::World;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub config: SimConfig,
    /// Falls back to the standard rule book
    pub rules: Option<RuleBookData>,
    pub sites: Vec<Site>,
    /// Roads between site keys
    pub roads: Vec<(String, String)>,
    pub player: PlayerSetup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub key: String,
    pub position: Position,
    #[serde(flatten)]
    pub kind: SiteKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SiteKind {
    TownCenter {
        #[serde(default)]
        market: Vec<ResourceAmount>,
    },
    Building {
        category: BuildingCategory,
        data: PredefinedBuildingData,
    },
    Residence {
        #[serde(default)]
        tier: ResidentTier,
        #[serde(default)]
        residents: u32,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSetup {
    pub stockpile: Vec<ResourceAmount>,
    pub promotion_slots: BTreeMap<ResidentTier, u32>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the world. Houses are placed after every other site so they
    /// can find their town center; roads touching an abandoned house are
    /// skipped.
    pub fn build(self) -> Result<World, DataError> {
        self.config.validate()?;
        let rules = match self.rules {
            Some(data) => RuleBook::from_data(data)?,
            None => RuleBook::standard(),
        };
        let mut world = World::new(rules, self.config);

        let mut player = Player::default();
        for amount in self.player.stockpile {
            player.stockpile.add(amount);
        }
        player.promotion_slots = self.player.promotion_slots;
        world.player = player;

        let (houses, others): (Vec<Site>, Vec<Site>) = self
            .sites
            .into_iter()
            .partition(|site| matches!(site.kind, SiteKind::Residence { .. }));

        let mut ids: HashMap<String, BuildingId> = HashMap::new();
        let mut abandoned: HashSet<String> = HashSet::new();
        for site in others.into_iter().chain(houses) {
            if ids.contains_key(&site.key) || abandoned.contains(&site.key) {
                return Err(DataError::DuplicateSite(site.key));
            }
            let id = match site.kind {
                SiteKind::TownCenter { market } => {
                    let id = world.add_town_center(site.position);
                    if let Some(hub) = world.hub_mut(id) {
                        for amount in market {
                            hub.market.add(amount);
                        }
                    }
                    id
                }
                SiteKind::Building { category, data } => {
                    world.add_building(category, site.position, &data)
                }
                SiteKind::Residence { tier, residents } => {
                    if world.rules().needs_for(tier).is_none() {
                        return Err(DataError::UnknownTier(tier.name().to_string()));
                    }
                    let (id, outcome) = world.spawn_residence(site.position, tier, residents);
                    if let BuildOutcome::Abandoned { .. } = outcome {
                        abandoned.insert(site.key);
                        continue;
                    }
                    id
                }
            };
            ids.insert(site.key, id);
        }

        for (a, b) in &self.roads {
            if abandoned.contains(a) || abandoned.contains(b) {
                continue;
            }
            let a = *ids.get(a).ok_or_else(|| DataError::UnknownBuilding(a.clone()))?;
            let b = *ids.get(b).ok_or_else(|| DataError::UnknownBuilding(b.clone()))?;
            world.connect(a, b);
        }

        Ok(world)
    }
}

/// A town center with a fishery, a cider farm, a chapel and three peasant
/// houses, all on one road network.
pub fn demo_village() -> World {
    let config = SimConfig {
        promotion_quota: 20,
        ..SimConfig::default()
    };
    let mut world = World::new(RuleBook::standard(), config);
    world.player = Player::default()
        .with_resource(Resource::Wood, 40)
        .with_resource(Resource::Tools, 10)
        .with_promotion_slots(ResidentTier::Citizen, 2);

    let center = world.add_town_center((0.0, 0.0));
    let fishery = world.add_building(
        BuildingCategory::Production,
        (400.0, 0.0),
        &PredefinedBuildingData::production("Fishery", Some(Resource::Fish), 4.0),
    );
    let cider_farm = world.add_building(
        BuildingCategory::Production,
        (0.0, 400.0),
        &PredefinedBuildingData::production("Cider Farm", Some(Resource::Cider), 5.0),
    );
    let chapel = world.add_building(
        BuildingCategory::Chapel,
        (-300.0, 0.0),
        &PredefinedBuildingData::chapel(),
    );
    for site in [fishery, cider_farm, chapel] {
        world.connect(center, site);
    }

    for position in [(200.0, 200.0), (250.0, -200.0), (-200.0, 250.0)] {
        let (house, _) = world.spawn_residence(position, ResidentTier::Peasant, 4);
        world.connect(center, house);
    }
    world
}
