use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tsify_next::Tsify;

// ============================================================================
// IDs - Using slotmap for generational indices
// ============================================================================

new_key_type! {
    pub struct BuildingId;
    pub struct BarrowId;
}

/// Trait for converting SlotMap keys to u64 for the WASM boundary and for
/// tracing fields
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for BuildingId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl KeyToU64 for BarrowId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

// ============================================================================
// Resources - The commodities residents consume
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Resource {
    Wood,
    Stone,
    Tools,
    Fish,
    Cider,
    Wool,
    Clothes,
}

impl Resource {
    /// Returns an iterator over all resources
    pub fn all() -> impl Iterator<Item = Resource> {
        [
            Resource::Wood,
            Resource::Stone,
            Resource::Tools,
            Resource::Fish,
            Resource::Cider,
            Resource::Wool,
            Resource::Clothes,
        ]
        .into_iter()
    }

    pub fn name(self) -> &'static str {
        match self {
            Resource::Wood => "Wood",
            Resource::Stone => "Stone",
            Resource::Tools => "Tools",
            Resource::Fish => "Fish",
            Resource::Cider => "Cider",
            Resource::Wool => "Wool",
            Resource::Clothes => "Clothes",
        }
    }
}

/// An amount of one resource: a cost entry, a cargo load, a stored stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ResourceAmount {
    pub kind: Resource,
    pub amount: u32,
}

impl ResourceAmount {
    pub fn new(kind: Resource, amount: u32) -> Self {
        Self { kind, amount }
    }

    /// Zero amount of `kind`; used as the empty slot of a building.
    pub fn empty(kind: Resource) -> Self {
        Self { kind, amount: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }
}

// ============================================================================
// Building categories
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum BuildingCategory {
    TownCenter,
    Chapel,
    Residence,
    Production,
}

// ============================================================================
// Resident needs - non-resource requirements
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Need {
    TownCenter,
    Chapel,
    Tavern,
}

impl Need {
    /// Building a residence must reach to have this need met. `None` means
    /// the game has no building that can satisfy it yet, so it is not tracked.
    pub fn required_category(self) -> Option<BuildingCategory> {
        match self {
            Need::TownCenter => Some(BuildingCategory::TownCenter),
            Need::Chapel => Some(BuildingCategory::Chapel),
            Need::Tavern => None,
        }
    }

    pub fn is_trackable(self) -> bool {
        self.required_category().is_some()
    }

    pub fn name(self) -> &'static str {
        match self {
            Need::TownCenter => "TownCenter",
            Need::Chapel => "Chapel",
            Need::Tavern => "Tavern",
        }
    }
}

// ============================================================================
// Resident tiers - ordered social ranks
// ============================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum ResidentTier {
    #[default]
    Peasant,
    Citizen,
    Patrician,
    Nobleman,
}

impl ResidentTier {
    pub fn all() -> impl Iterator<Item = ResidentTier> {
        [
            ResidentTier::Peasant,
            ResidentTier::Citizen,
            ResidentTier::Patrician,
            ResidentTier::Nobleman,
        ]
        .into_iter()
    }

    /// The tier a promotion leads to; `None` at the top.
    pub fn next(self) -> Option<ResidentTier> {
        match self {
            ResidentTier::Peasant => Some(ResidentTier::Citizen),
            ResidentTier::Citizen => Some(ResidentTier::Patrician),
            ResidentTier::Patrician => Some(ResidentTier::Nobleman),
            ResidentTier::Nobleman => None,
        }
    }

    /// Name of the upgrade rule that promotes residents *into* this tier.
    pub fn upgrade_rule(self) -> Option<&'static str> {
        match self {
            ResidentTier::Peasant => None,
            ResidentTier::Citizen => Some("CitizenUpgrade"),
            ResidentTier::Patrician => Some("PatricianUpgrade"),
            ResidentTier::Nobleman => Some("NoblemanUpgrade"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResidentTier::Peasant => "Peasant",
            ResidentTier::Citizen => "Citizen",
            ResidentTier::Patrician => "Patrician",
            ResidentTier::Nobleman => "Nobleman",
        }
    }
}

/// A point on the map
pub type Position = (f32, f32);

pub fn distance(a: Position, b: Position) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}
