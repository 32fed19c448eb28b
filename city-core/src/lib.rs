use wasm_bindgen::prelude::*;

pub mod barrow;
pub mod building;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod hub;
pub mod player;
pub mod residence;
pub mod rules;
pub mod scenario;
pub mod snapshot;
pub mod stockpile;
pub mod types;
pub mod world;

pub use config::SimConfig;
pub use error::DataError;
pub use residence::{BuildOutcome, MigrationStep, PromotionOutcome, Residence, TickReport};
pub use rules::RuleBook;
pub use snapshot::CitySnapshot;
pub use types::*;
pub use world::World;

#[cfg(feature = "instrument")]
pub use instrument;

// ============================================================================
// WASM API - Simulation
// ============================================================================

#[wasm_bindgen]
pub struct Simulation {
    world: World,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Simulation {
    /// The demo village
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        Self {
            world: scenario::demo_village(),
        }
    }

    /// Create a simulation from a scenario given as JSON text
    #[wasm_bindgen]
    pub fn from_scenario_json(json: &str) -> Result<Simulation, JsError> {
        console_error_panic_hook::set_once();
        let world = scenario::Scenario::from_json(json)?.build()?;
        Ok(Self { world })
    }

    /// Create a simulation from a scenario given as a JS object
    #[wasm_bindgen]
    pub fn from_scenario(value: JsValue) -> Result<Simulation, JsError> {
        console_error_panic_hook::set_once();
        let scenario: scenario::Scenario = serde_wasm_bindgen::from_value(value)
            .map_err(|err| JsError::new(&err.to_string()))?;
        Ok(Self {
            world: scenario.build()?,
        })
    }

    /// Advance the simulation by `dt` seconds
    #[wasm_bindgen]
    pub fn advance(&mut self, dt: f32) {
        self.world.tick(dt);
    }

    /// Get the current tick
    #[wasm_bindgen]
    pub fn get_tick(&self) -> u64 {
        self.world.tick
    }

    /// Get a snapshot of the current state for rendering
    #[wasm_bindgen]
    pub fn get_snapshot(&self) -> CitySnapshot {
        self.world.snapshot()
    }

    /// Player-placed house. Returns its id, or `None` when the player cannot
    /// pay or no town center is in range.
    #[wasm_bindgen]
    pub fn place_residence(&mut self, x: f32, y: f32) -> Option<u64> {
        match self.world.place_residence((x, y))? {
            (id, BuildOutcome::Settled { .. }) => Some(id.to_u64()),
            (_, BuildOutcome::Abandoned { .. }) => None,
        }
    }

    /// Lay a road between two buildings
    #[wasm_bindgen]
    pub fn connect(&mut self, a: u64, b: u64) -> bool {
        let a = BuildingId::from(slotmap::KeyData::from_ffi(a));
        let b = BuildingId::from(slotmap::KeyData::from_ffi(b));
        self.world.connect(a, b)
    }
}

impl Simulation {
    pub fn world(&self) -> &World {
        &self.world
    }
}
