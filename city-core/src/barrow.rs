//! Market carts: fetch one ordered resource from a producer and bring it back
//! to the hub that sent them.
//!
//! A cart's trip is driven by move completions reported by the host:
//! `dispatch` asks for a move to the target, the first completion picks the
//! goods up and asks for a move home, the second one delivers. Any failed
//! move ends the trip early (the cart takes its lunch break).

use serde::{Deserialize, Serialize};

use crate::building::Building;
#[cfg(feature = "instrument")]
use crate::types::KeyToU64;
use crate::types::{BarrowId, BuildingId, Position, Resource, ResourceAmount, distance};

/// Outcome of a move request, as reported by whatever moved the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResult {
    Success,
    Blocked,
    Aborted,
}

/// What a move completion did to the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStep {
    /// Loaded at the target and heading home
    PickedUp(ResourceAmount),
    /// Trip over. `lost` counts picked-up units that never reached the
    /// workplace. `pooled` is false when the workplace had no room for the
    /// cart and the host should drop it.
    Finished { delivered: u32, lost: u32, pooled: bool },
}

/// A building carts fetch from.
pub trait Supplier {
    fn hand_out_resource(&mut self, kind: Resource) -> ResourceAmount;
    fn set_barrow_on_the_way(&mut self, on_the_way: bool);
}

/// The building that owns carts and receives what they bring.
pub trait Workplace {
    /// Returns the amount accepted
    fn receive_resource(&mut self, resource: ResourceAmount) -> u32;
    fn decrease_barrows_in_use(&mut self);
    fn try_returning_to_pool(&mut self, barrow: BarrowId) -> bool;
}

impl Supplier for Building {
    fn hand_out_resource(&mut self, kind: Resource) -> ResourceAmount {
        Building::hand_out_resource(self, kind)
    }

    fn set_barrow_on_the_way(&mut self, on_the_way: bool) {
        self.barrow_on_the_way = on_the_way;
    }
}

/// One fetch order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trip {
    pub workplace: BuildingId,
    pub home: Position,
    pub target: BuildingId,
    pub target_position: Position,
    pub resource: Resource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barrow {
    id: BarrowId,
    pub position: Position,
    workplace: Option<BuildingId>,
    target: Option<BuildingId>,
    start: Position,
    target_position: Position,
    cargo: Option<ResourceAmount>,
    arrived_at_target: bool,
    /// Pending move request
    destination: Option<Position>,
    active: bool,
}

impl Barrow {
    pub fn new(id: BarrowId) -> Self {
        Self {
            id,
            position: (0.0, 0.0),
            workplace: None,
            target: None,
            start: (0.0, 0.0),
            target_position: (0.0, 0.0),
            cargo: None,
            arrived_at_target: false,
            destination: None,
            active: false,
        }
    }

    pub fn id(&self) -> BarrowId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn workplace(&self) -> Option<BuildingId> {
        self.workplace
    }

    pub fn target(&self) -> Option<BuildingId> {
        self.target
    }

    pub fn destination(&self) -> Option<Position> {
        self.destination
    }

    pub fn cargo(&self) -> Option<ResourceAmount> {
        self.cargo
    }

    /// Resets the cart at the workplace and sends it to the target.
    pub fn dispatch(&mut self, trip: Trip, supplier: &mut dyn Supplier) {
        self.position = trip.home;
        self.start = trip.home;
        self.target_position = trip.target_position;
        self.workplace = Some(trip.workplace);
        self.target = Some(trip.target);
        self.cargo = Some(ResourceAmount::empty(trip.resource));
        self.arrived_at_target = false;
        self.active = true;
        supplier.set_barrow_on_the_way(true);
        self.destination = Some(trip.target_position);
    }

    /// Moves in a straight line towards the pending destination. Returns the
    /// move result once the destination is reached.
    pub fn advance(&mut self, dt: f32, speed: f32) -> Option<MoveResult> {
        let destination = self.destination?;
        let remaining = distance(self.position, destination);
        let step = speed * dt;
        if step >= remaining {
            self.position = destination;
            self.destination = None;
            return Some(MoveResult::Success);
        }
        let t = step / remaining;
        self.position = (
            self.position.0 + (destination.0 - self.position.0) * t,
            self.position.1 + (destination.1 - self.position.1) * t,
        );
        None
    }

    /// Handles a finished move. A successful move that stopped short of the
    /// acceptance radius ends the trip without a delivery; cargo already
    /// picked up is then reported as lost.
    pub fn on_move_completed(
        &mut self,
        result: MoveResult,
        acceptance_radius: f32,
        supplier: &mut dyn Supplier,
        workplace: &mut dyn Workplace,
    ) -> DeliveryStep {
        #[cfg(feature = "instrument")]
        let resource = self.cargo.map(|c| c.kind.name()).unwrap_or("none");
        self.destination = None;
        let step = match result {
            MoveResult::Success if !self.arrived_at_target => {
                if distance(self.target_position, self.position) <= acceptance_radius {
                    self.arrived_at_target = true;
                    let kind = self.cargo.map(|c| c.kind);
                    let loaded = kind.map(|kind| supplier.hand_out_resource(kind));
                    self.cargo = loaded;
                    self.destination = Some(self.start);
                    loaded.map(DeliveryStep::PickedUp)
                } else {
                    None
                }
            }
            MoveResult::Success => {
                let delivered = match self.cargo {
                    Some(cargo) if distance(self.start, self.position) <= acceptance_radius => {
                        workplace.receive_resource(cargo)
                    }
                    _ => 0,
                };
                Some(self.have_lunch_break(delivered, supplier, workplace))
            }
            MoveResult::Blocked | MoveResult::Aborted => None,
        };
        let step = match step {
            Some(step) => step,
            None => self.have_lunch_break(0, supplier, workplace),
        };

        #[cfg(feature = "instrument")]
        {
            let (outcome, amount) = match step {
                DeliveryStep::PickedUp(cargo) => ("picked_up", cargo.amount),
                DeliveryStep::Finished { lost, .. } if lost > 0 => ("lost", lost),
                DeliveryStep::Finished { delivered, pooled: true, .. } => ("pooled", delivered),
                DeliveryStep::Finished { delivered, pooled: false, .. } => ("dropped", delivered),
            };
            tracing::info!(
                target: "delivery",
                barrow = self.id.to_u64(),
                resource = resource,
                amount = amount,
                outcome = outcome,
            );
        }

        step
    }

    /// Ends the trip. Whatever of a picked-up load the workplace did not
    /// take is lost.
    fn have_lunch_break(
        &mut self,
        delivered: u32,
        supplier: &mut dyn Supplier,
        workplace: &mut dyn Workplace,
    ) -> DeliveryStep {
        let lost = match self.cargo.take() {
            Some(cargo) if self.arrived_at_target => cargo.amount.saturating_sub(delivered),
            _ => 0,
        };
        supplier.set_barrow_on_the_way(false);
        workplace.decrease_barrows_in_use();
        let pooled = workplace.try_returning_to_pool(self.id);
        self.active = false;
        self.destination = None;
        DeliveryStep::Finished {
            delivered,
            lost,
            pooled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::{BuildingData, PredefinedBuildingData};
    use crate::hub::TownCenter;
    use crate::types::BuildingCategory;
    use slotmap::SlotMap;

    struct Setup {
        barrow: Barrow,
        fishery: Building,
        hub: TownCenter,
        trip: Trip,
    }

    fn setup() -> Setup {
        let mut buildings: SlotMap<BuildingId, ()> = SlotMap::with_key();
        let mut barrows: SlotMap<BarrowId, ()> = SlotMap::with_key();
        let mut fishery = Building::new(
            BuildingCategory::Production,
            (300.0, 0.0),
            BuildingData::from_predefined(&PredefinedBuildingData::production(
                "Fishery",
                Some(Resource::Fish),
                1.0,
            )),
        );
        for _ in 0..3 {
            fishery.tick_production(1.0);
        }
        let mut hub = TownCenter::new(2);
        hub.increase_barrows_in_use();
        Setup {
            barrow: Barrow::new(barrows.insert(())),
            fishery,
            hub,
            trip: Trip {
                workplace: buildings.insert(()),
                home: (0.0, 0.0),
                target: buildings.insert(()),
                target_position: (300.0, 0.0),
                resource: Resource::Fish,
            },
        }
    }

    fn drive(barrow: &mut Barrow, dt: f32) -> MoveResult {
        loop {
            if let Some(result) = barrow.advance(dt, 300.0) {
                return result;
            }
        }
    }

    #[test]
    fn full_trip_delivers_to_the_workplace() {
        let Setup { mut barrow, mut fishery, mut hub, trip } = setup();
        barrow.dispatch(trip, &mut fishery);
        assert!(fishery.barrow_on_the_way);
        assert_eq!(barrow.destination(), Some((300.0, 0.0)));

        let result = drive(&mut barrow, 0.25);
        let step = barrow.on_move_completed(result, 50.0, &mut fishery, &mut hub);
        assert_eq!(step, DeliveryStep::PickedUp(ResourceAmount::new(Resource::Fish, 3)));
        assert_eq!(fishery.stored(Resource::Fish), 0);
        assert_eq!(barrow.destination(), Some((0.0, 0.0)));

        let result = drive(&mut barrow, 0.25);
        let step = barrow.on_move_completed(result, 50.0, &mut fishery, &mut hub);
        assert_eq!(step, DeliveryStep::Finished { delivered: 3, lost: 0, pooled: true });
        assert_eq!(hub.market.get(Resource::Fish), 3);
        assert_eq!(hub.barrows_in_use, 0);
        assert_eq!(hub.pooled(), 1);
        assert!(!fishery.barrow_on_the_way);
        assert!(!barrow.is_active());
    }

    #[test]
    fn failed_move_ends_the_trip() {
        let Setup { mut barrow, mut fishery, mut hub, trip } = setup();
        barrow.dispatch(trip, &mut fishery);

        let step = barrow.on_move_completed(MoveResult::Blocked, 50.0, &mut fishery, &mut hub);

        assert_eq!(step, DeliveryStep::Finished { delivered: 0, lost: 0, pooled: true });
        assert_eq!(fishery.stored(Resource::Fish), 3);
        assert!(!fishery.barrow_on_the_way);
        assert_eq!(hub.barrows_in_use, 0);
    }

    #[test]
    fn stopping_short_of_the_target_delivers_nothing() {
        let Setup { mut barrow, mut fishery, mut hub, trip } = setup();
        barrow.dispatch(trip, &mut fishery);
        barrow.position = (100.0, 0.0);

        let step = barrow.on_move_completed(MoveResult::Success, 50.0, &mut fishery, &mut hub);

        assert_eq!(step, DeliveryStep::Finished { delivered: 0, lost: 0, pooled: true });
        assert_eq!(hub.market.get(Resource::Fish), 0);
    }

    #[test]
    fn load_that_never_makes_it_home_is_lost() {
        let Setup { mut barrow, mut fishery, mut hub, trip } = setup();
        barrow.dispatch(trip, &mut fishery);
        let result = drive(&mut barrow, 0.25);
        barrow.on_move_completed(result, 50.0, &mut fishery, &mut hub);

        barrow.position = (150.0, 0.0);
        let step = barrow.on_move_completed(MoveResult::Success, 50.0, &mut fishery, &mut hub);

        assert_eq!(step, DeliveryStep::Finished { delivered: 0, lost: 3, pooled: true });
        assert_eq!(hub.market.get(Resource::Fish), 0);
        assert_eq!(barrow.cargo(), None);
    }

    #[test]
    fn blocked_return_loses_the_load() {
        let Setup { mut barrow, mut fishery, mut hub, trip } = setup();
        barrow.dispatch(trip, &mut fishery);
        let result = drive(&mut barrow, 0.25);
        barrow.on_move_completed(result, 50.0, &mut fishery, &mut hub);

        let step = barrow.on_move_completed(MoveResult::Blocked, 50.0, &mut fishery, &mut hub);

        assert_eq!(step, DeliveryStep::Finished { delivered: 0, lost: 3, pooled: true });
    }

    #[test]
    fn cart_is_dropped_when_the_pool_is_full() {
        let Setup { mut barrow, mut fishery, trip, .. } = setup();
        let mut hub = TownCenter::new(0);
        barrow.dispatch(trip, &mut fishery);

        let step = barrow.on_move_completed(MoveResult::Aborted, 50.0, &mut fishery, &mut hub);

        assert_eq!(step, DeliveryStep::Finished { delivered: 0, lost: 0, pooled: false });
    }

    #[test]
    fn advance_moves_at_constant_speed() {
        let Setup { mut barrow, mut fishery, trip, .. } = setup();
        barrow.dispatch(trip, &mut fishery);
        assert_eq!(barrow.advance(0.5, 300.0), None);
        assert!((barrow.position.0 - 150.0).abs() < 1e-3);
        assert_eq!(barrow.advance(0.5, 300.0), Some(MoveResult::Success));
        assert_eq!(barrow.position, (300.0, 0.0));
        assert_eq!(barrow.advance(0.5, 300.0), None);
    }
}
