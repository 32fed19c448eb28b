// Read-only views of the world for the browser front end

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::residence::SatisfactionSnapshot;
use crate::types::{KeyToU64, Position, ResidentTier, ResourceAmount};
use crate::world::World;

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct CitySnapshot {
    pub tick: u64,
    pub residences: Vec<ResidenceSnapshot>,
    pub hubs: Vec<HubSnapshot>,
    pub player: PlayerSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct ResidenceSnapshot {
    pub id: u64,
    pub name: String,
    pub position: Position,
    pub tier: ResidentTier,
    pub residents: u32,
    pub max_residents: u32,
    pub hub: Option<u64>,
    pub satisfaction: SatisfactionSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct HubSnapshot {
    pub id: u64,
    pub position: Position,
    pub population: BTreeMap<ResidentTier, u32>,
    pub market: Vec<ResourceAmount>,
    pub barrows_in_use: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct PlayerSnapshot {
    pub stockpile: Vec<ResourceAmount>,
    pub population: BTreeMap<ResidentTier, u32>,
    pub promotion_slots: BTreeMap<ResidentTier, u32>,
}

impl World {
    pub fn snapshot(&self) -> CitySnapshot {
        let residences = self
            .residences()
            .map(|(id, residence)| ResidenceSnapshot {
                id: id.to_u64(),
                name: residence.data.name.clone(),
                position: self.building(id).map_or((0.0, 0.0), |b| b.position),
                tier: residence.tier(),
                residents: residence.residents(),
                max_residents: residence.max_residents(),
                hub: residence.hub().map(KeyToU64::to_u64),
                satisfaction: residence.snapshot(),
            })
            .collect();

        let hubs = self
            .hubs()
            .map(|(id, hub)| HubSnapshot {
                id: id.to_u64(),
                position: self.building(id).map_or((0.0, 0.0), |b| b.position),
                population: hub.population.clone(),
                market: hub.market.amounts(),
                barrows_in_use: hub.barrows_in_use,
            })
            .collect();

        CitySnapshot {
            tick: self.tick,
            residences,
            hubs,
            player: PlayerSnapshot {
                stockpile: self.player.stockpile.amounts(),
                population: self.player.population.clone(),
                promotion_slots: self.player.promotion_slots.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resource;

    #[test]
    fn snapshot_lists_houses_hubs_and_player() {
        let mut world = World::default();
        let center = world.add_town_center((0.0, 0.0));
        world.player.stockpile.add(ResourceAmount::new(Resource::Tools, 2));
        let (house, _) = world.spawn_residence((100.0, 50.0), ResidentTier::Peasant, 3);

        let snapshot = world.snapshot();

        assert_eq!(snapshot.residences.len(), 1);
        let view = &snapshot.residences[0];
        assert_eq!(view.id, house.to_u64());
        assert_eq!(view.position, (100.0, 50.0));
        assert_eq!(view.residents, 3);
        assert_eq!(view.hub, Some(center.to_u64()));
        assert_eq!(view.satisfaction.total, 1.0);

        assert_eq!(snapshot.hubs[0].population[&ResidentTier::Peasant], 3);
        assert_eq!(
            snapshot.player.stockpile,
            vec![ResourceAmount::new(Resource::Tools, 2)]
        );
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut world = World::default();
        world.add_town_center((0.0, 0.0));
        let json = serde_json::to_value(world.snapshot()).unwrap();
        assert_eq!(json["tick"], 0);
        assert!(json["residences"].as_array().unwrap().is_empty());
    }
}
