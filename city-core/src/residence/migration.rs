// Resident migration driven by aggregate satisfaction

use super::Residence;
use crate::collaborators::Neighbourhood;
#[cfg(feature = "instrument")]
use crate::types::KeyToU64;

/// Outcome of one migration cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    MovedIn,
    MovedOut,
    /// Inside the hysteresis band, or at a bound
    Stayed,
}

impl MigrationStep {
    pub fn delta(self) -> i32 {
        match self {
            MigrationStep::MovedIn => 1,
            MigrationStep::MovedOut => -1,
            MigrationStep::Stayed => 0,
        }
    }
}

impl Residence {
    /// Moves at most one resident in or out and tells the hub about it. A
    /// residence that tracks no demands never migrates.
    pub fn move_residents(&mut self, ctx: &mut Neighbourhood<'_>) -> MigrationStep {
        let total = self.satisfaction.total();
        let step = if self.satisfaction.is_empty() {
            MigrationStep::Stayed
        } else if self.residents < self.max_residents && total > self.config.grow_threshold {
            self.residents += 1;
            MigrationStep::MovedIn
        } else if self.residents > 0 && total < self.config.shrink_threshold {
            self.residents -= 1;
            MigrationStep::MovedOut
        } else {
            MigrationStep::Stayed
        };

        if step == MigrationStep::Stayed {
            return step;
        }

        let _notified = match ctx.hub.as_deref_mut() {
            Some(hub) => {
                hub.update_population(self.tier, step.delta());
                true
            }
            None => false,
        };

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "migration",
            residence = self.building.to_u64(),
            tier = self.tier.name(),
            delta = step.delta(),
            residents = self.residents,
            notified = _notified,
        );

        step
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::types::{BuildingCategory, Resource, ResidentTier};

    #[test]
    fn satisfied_residence_attracts_one_resident_per_cycle() {
        let mut residence = residence(ResidentTier::Peasant, 2);
        let map = FakeMap::reaching(&[BuildingCategory::TownCenter]);
        let mut hub = FakeHub::default();
        let mut ctx = Neighbourhood::new(&map).with_hub(&mut hub);

        assert_eq!(residence.move_residents(&mut ctx), MigrationStep::MovedIn);
        assert_eq!(residence.move_residents(&mut ctx), MigrationStep::MovedIn);
        assert_eq!(residence.move_residents(&mut ctx), MigrationStep::Stayed);
        assert_eq!(residence.residents(), 2);
        drop(ctx);
        assert_eq!(hub.reports, vec![(ResidentTier::Peasant, 1); 2]);
    }

    #[test]
    fn unhappy_residence_loses_residents_down_to_zero() {
        let mut residence = residence(ResidentTier::Peasant, 5).with_residents(1);
        let map = FakeMap::reaching(&[]);
        let mut hub = FakeHub::default();
        let mut ctx = Neighbourhood::new(&map).with_hub(&mut hub);

        // needs unmet, resources draining
        for _ in 0..20 {
            residence.update_satisfaction(&mut ctx);
        }
        assert!(residence.total_satisfaction() < 0.5);

        assert_eq!(residence.move_residents(&mut ctx), MigrationStep::MovedOut);
        assert_eq!(residence.move_residents(&mut ctx), MigrationStep::Stayed);
        assert_eq!(residence.residents(), 0);
    }

    #[test]
    fn hysteresis_band_holds_population() {
        let mut residence = residence(ResidentTier::Citizen, 5).with_residents(3);
        let map = FakeMap::reaching(&[BuildingCategory::TownCenter]);
        let mut hub = FakeHub::stocking(&[Resource::Fish]);
        let mut ctx = Neighbourhood::new(&map).with_hub(&mut hub);

        // chapel unmet, cider and clothes drain: (1 + 2x + 1 + 0) / 5
        while residence.total_satisfaction() > 0.65 {
            residence.update_satisfaction(&mut ctx);
        }
        let total = residence.total_satisfaction();
        assert!((0.5..=0.65).contains(&total), "total = {total}");
        assert_eq!(residence.move_residents(&mut ctx), MigrationStep::Stayed);
        assert_eq!(residence.residents(), 3);
    }

    #[test]
    fn residence_without_demands_keeps_its_residents() {
        let mut residence = residence(ResidentTier::Patrician, 8).with_residents(5);
        assert_eq!(residence.snapshot().total, 1.0);
        let map = FakeMap::reaching(&[BuildingCategory::TownCenter]);
        let mut hub = FakeHub::default();
        let mut ctx = Neighbourhood::new(&map).with_hub(&mut hub);

        for _ in 0..20 {
            residence.update_satisfaction(&mut ctx);
            assert_eq!(residence.move_residents(&mut ctx), MigrationStep::Stayed);
        }
        assert_eq!(residence.residents(), 5);
        assert_eq!(residence.total_satisfaction(), 1.0);
        drop(ctx);
        assert!(hub.reports.is_empty());
    }

    #[test]
    fn migration_without_hub_still_moves_residents() {
        let mut residence = residence(ResidentTier::Peasant, 5);
        let map = FakeMap::reaching(&[]);
        let mut ctx = Neighbourhood::new(&map);

        assert_eq!(residence.move_residents(&mut ctx), MigrationStep::MovedIn);
        assert_eq!(residence.residents(), 1);
    }
}
