//! Game data the settlement model looks up but never owns: tier upgrade rules
//! and the needs each tier brings.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::types::{Need, Resource, ResidentTier, ResourceAmount};

/// What a residence becomes when its residents are promoted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierUpgradeRule {
    /// Lookup key, e.g. "CitizenUpgrade"
    pub rule: String,
    /// Display name the building takes
    pub name: String,
    pub resident_tier: ResidentTier,
    #[serde(default)]
    pub cost: Vec<ResourceAmount>,
    pub new_maximum: u32,
    /// New production time; absent or negative leaves it unchanged
    #[serde(default)]
    pub production_time: Option<f32>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub mesh: String,
}

impl TierUpgradeRule {
    pub fn production_time_override(&self) -> Option<f32> {
        self.production_time.filter(|t| *t >= 0.0)
    }
}

/// Resources consumed and needs demanded by one tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierNeeds {
    #[serde(default)]
    pub consumptions: Vec<Resource>,
    #[serde(default)]
    pub needs: Vec<Need>,
}

pub trait RuleProvider {
    /// `None` for unknown rule names
    fn upgrade_rule(&self, name: &str) -> Option<&TierUpgradeRule>;
}

pub trait NeedsCatalog {
    fn needs_for(&self, tier: ResidentTier) -> Option<&TierNeeds>;
}

/// Everything a residence needs injected at construction.
pub trait TierCatalog: RuleProvider + NeedsCatalog {}

impl<T: RuleProvider + NeedsCatalog> TierCatalog for T {}

/// Serialized form of a [`RuleBook`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleBookData {
    #[serde(default)]
    pub upgrades: Vec<TierUpgradeRule>,
    #[serde(default)]
    pub needs: BTreeMap<ResidentTier, TierNeeds>,
}

/// Rule table keyed by upgrade name, plus per-tier needs.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    upgrades: HashMap<String, TierUpgradeRule>,
    needs: BTreeMap<ResidentTier, TierNeeds>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, DataError> {
        let data: RuleBookData = serde_json::from_str(text)?;
        Self::from_data(data)
    }

    pub fn from_data(data: RuleBookData) -> Result<Self, DataError> {
        let mut book = RuleBook {
            upgrades: HashMap::new(),
            needs: data.needs,
        };
        for rule in data.upgrades {
            if book.upgrades.contains_key(&rule.rule) {
                return Err(DataError::DuplicateRule(rule.rule));
            }
            book.upgrades.insert(rule.rule.clone(), rule);
        }
        if !book.needs.contains_key(&ResidentTier::Peasant) {
            return Err(DataError::UnknownTier(
                ResidentTier::Peasant.name().to_string(),
            ));
        }
        Ok(book)
    }

    pub fn with_upgrade(mut self, rule: TierUpgradeRule) -> Self {
        self.upgrades.insert(rule.rule.clone(), rule);
        self
    }

    pub fn with_needs(mut self, tier: ResidentTier, needs: TierNeeds) -> Self {
        self.needs.insert(tier, needs);
        self
    }

    /// Peasants and citizens as shipped with the base game.
    pub fn standard() -> Self {
        RuleBook::new()
            .with_needs(
                ResidentTier::Peasant,
                TierNeeds {
                    consumptions: vec![Resource::Fish, Resource::Cider],
                    needs: vec![Need::TownCenter],
                },
            )
            .with_needs(
                ResidentTier::Citizen,
                TierNeeds {
                    consumptions: vec![Resource::Fish, Resource::Cider, Resource::Clothes],
                    needs: vec![Need::TownCenter, Need::Chapel, Need::Tavern],
                },
            )
            .with_upgrade(TierUpgradeRule {
                rule: "CitizenUpgrade".to_string(),
                name: "Citizen House".to_string(),
                resident_tier: ResidentTier::Citizen,
                cost: vec![
                    ResourceAmount::new(Resource::Wood, 2),
                    ResourceAmount::new(Resource::Tools, 1),
                ],
                new_maximum: 15,
                production_time: Some(45.0),
                icon: "icons/citizen_house".to_string(),
                mesh: "meshes/citizen_house".to_string(),
            })
    }
}

impl RuleProvider for RuleBook {
    fn upgrade_rule(&self, name: &str) -> Option<&TierUpgradeRule> {
        self.upgrades.get(name)
    }
}

impl NeedsCatalog for RuleBook {
    fn needs_for(&self, tier: ResidentTier) -> Option<&TierNeeds> {
        self.needs.get(&tier)
    }
}
