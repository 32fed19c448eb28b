// Tier promotion: a one-way state machine over ResidentTier

use super::Residence;
use crate::collaborators::Neighbourhood;
#[cfg(feature = "instrument")]
use crate::types::KeyToU64;
use crate::types::ResidentTier;

/// Result of an upgrade attempt. Everything but `Promoted` left the residence
/// and the owner's stockpile untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionOutcome {
    Promoted { from: ResidentTier, to: ResidentTier },
    UnknownRule,
    /// The rule leads to the current tier or below
    NotAnUpgrade,
    NoOwner,
    Unaffordable,
}

impl PromotionOutcome {
    pub fn is_promoted(self) -> bool {
        matches!(self, PromotionOutcome::Promoted { .. })
    }

    pub fn label(self) -> &'static str {
        match self {
            PromotionOutcome::Promoted { .. } => "promoted",
            PromotionOutcome::UnknownRule => "unknown_rule",
            PromotionOutcome::NotAnUpgrade => "not_an_upgrade",
            PromotionOutcome::NoOwner => "no_owner",
            PromotionOutcome::Unaffordable => "unaffordable",
        }
    }
}

impl Residence {
    /// Rule to apply when this residence qualifies for promotion: full,
    /// satisfied enough, below the top tier, and the owner has enough residents
    /// of the current tier plus a free promotion slot for the next one.
    /// Residences tracking no demands never qualify.
    pub(super) fn promotion_rule(&self, ctx: &Neighbourhood<'_>) -> Option<&'static str> {
        if self.satisfaction.is_empty()
            || self.satisfaction.total() < self.config.promotion_threshold
            || self.residents != self.max_residents
        {
            return None;
        }
        let next = self.tier.next()?;
        let owner = ctx.owner.as_deref()?;
        if owner.population(self.tier) < self.config.promotion_quota
            || owner.available_promotions(next) == 0
        {
            return None;
        }
        next.upgrade_rule()
    }

    /// Applies the named upgrade rule, paid from the owner's stockpile.
    pub fn upgrade(&mut self, rule_name: &str, ctx: &mut Neighbourhood<'_>) -> PromotionOutcome {
        #[cfg(feature = "instrument")]
        let from = self.tier;
        let outcome = self.apply_upgrade(rule_name, ctx);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "promotion",
            residence = self.building.to_u64(),
            rule = rule_name,
            from = from.name(),
            to = self.tier.name(),
            outcome = outcome.label(),
        );

        outcome
    }

    fn apply_upgrade(&mut self, rule_name: &str, ctx: &mut Neighbourhood<'_>) -> PromotionOutcome {
        let Some(rule) = self.catalog.upgrade_rule(rule_name).cloned() else {
            return PromotionOutcome::UnknownRule;
        };
        if rule.resident_tier <= self.tier {
            return PromotionOutcome::NotAnUpgrade;
        }
        let Some(owner) = ctx.owner.as_deref_mut() else {
            return PromotionOutcome::NoOwner;
        };
        if !owner.has_enough_resources(&rule.cost) {
            return PromotionOutcome::Unaffordable;
        }

        for cost in &rule.cost {
            owner.remove_resource(*cost);
        }

        if let Some(production_time) = rule.production_time_override() {
            self.data.production_time = production_time;
        }
        self.data.icon = rule.icon;
        self.data.name = rule.name;
        self.mesh = rule.mesh;
        self.max_residents = rule.new_maximum;

        let from = self.tier;
        let to = rule.resident_tier;
        let moved = self.residents;
        owner.report_tier_change(self.building, from, to);
        owner.update_population(from, to, moved);
        if let Some(hub) = ctx.hub.as_deref_mut() {
            hub.update_population(from, -(moved as i32));
            hub.update_population(to, moved as i32);
            if moved > self.max_residents {
                hub.update_population(to, -((moved - self.max_residents) as i32));
            }
        }
        self.residents = moved.min(self.max_residents);
        self.tier = to;

        // new demands start unmet
        if let Some(needs) = self.catalog.needs_for(to) {
            self.satisfaction.seed(needs, false);
        }
        self.satisfaction.recompute_total();

        PromotionOutcome::Promoted { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::collaborators::StockpileOwner;
    use crate::player::Player;
    use crate::types::{BuildingCategory, Need, Resource};

    fn rich_player() -> Player {
        let mut player = Player::default()
            .with_resource(Resource::Wood, 10)
            .with_resource(Resource::Tools, 5)
            .with_promotion_slots(ResidentTier::Citizen, 3);
        player.population.insert(ResidentTier::Peasant, 120);
        player
    }

    #[test]
    fn upgrade_pays_and_rewrites_the_residence() {
        let mut residence = residence(ResidentTier::Peasant, 10).with_residents(10);
        let map = FakeMap::reaching(&[BuildingCategory::TownCenter]);
        let mut player = rich_player();
        let mut hub = FakeHub::default();
        let mut ctx = Neighbourhood::new(&map)
            .with_hub(&mut hub)
            .with_owner(&mut player);

        let outcome = residence.upgrade("CitizenUpgrade", &mut ctx);
        drop(ctx);

        assert_eq!(
            outcome,
            PromotionOutcome::Promoted {
                from: ResidentTier::Peasant,
                to: ResidentTier::Citizen
            }
        );
        assert_eq!(residence.tier(), ResidentTier::Citizen);
        assert_eq!(residence.max_residents(), 15);
        assert_eq!(residence.data.name, "Citizen House");
        assert_eq!(residence.data.production_time, 45.0);
        assert_eq!(residence.mesh, "meshes/citizen_house");
        assert_eq!(player.stockpile.get(Resource::Wood), 8);
        assert_eq!(player.stockpile.get(Resource::Tools), 4);
        assert_eq!(
            player.tier_changes,
            vec![(residence.building(), ResidentTier::Peasant, ResidentTier::Citizen)]
        );
        assert_eq!(
            hub.reports,
            vec![(ResidentTier::Peasant, -10), (ResidentTier::Citizen, 10)]
        );
    }

    #[test]
    fn new_requirements_start_unmet() {
        let mut residence = residence(ResidentTier::Peasant, 10).with_residents(10);
        let map = FakeMap::reaching(&[]);
        let mut player = rich_player();
        let mut ctx = Neighbourhood::new(&map).with_owner(&mut player);

        residence.upgrade("CitizenUpgrade", &mut ctx);

        let snapshot = residence.snapshot();
        assert_eq!(snapshot.resources[&Resource::Fish], 1.0, "kept from peasant tier");
        assert_eq!(snapshot.resources[&Resource::Clothes], 0.0);
        assert!(!snapshot.needs[&Need::Chapel]);
        assert!(!snapshot.needs.contains_key(&Need::Tavern));
        // fish, cider, town center met; clothes, chapel unmet
        assert!((snapshot.total - 0.6).abs() < 1e-6, "total = {}", snapshot.total);
    }

    #[test]
    fn insufficient_stockpile_changes_nothing() {
        let mut residence = residence(ResidentTier::Peasant, 10).with_residents(10);
        let before = residence.snapshot();
        let map = FakeMap::reaching(&[]);
        let mut player = Player::default().with_resource(Resource::Wood, 1);
        let stock_before = player.stockpile.clone();
        let mut ctx = Neighbourhood::new(&map).with_owner(&mut player);

        let outcome = residence.upgrade("CitizenUpgrade", &mut ctx);

        assert_eq!(outcome, PromotionOutcome::Unaffordable);
        assert_eq!(residence.tier(), ResidentTier::Peasant);
        assert_eq!(residence.max_residents(), 10);
        assert_eq!(residence.data.name, "Peasant House");
        assert_eq!(residence.snapshot(), before);
        assert_eq!(player.stockpile, stock_before);
    }

    #[test]
    fn unknown_rule_and_missing_owner_are_no_ops() {
        let mut residence = residence(ResidentTier::Peasant, 10).with_residents(10);
        let map = FakeMap::reaching(&[]);

        let mut ctx = Neighbourhood::new(&map);
        assert_eq!(residence.upgrade("CitizenUpgrade", &mut ctx), PromotionOutcome::NoOwner);

        let mut player = rich_player();
        let mut ctx = Neighbourhood::new(&map).with_owner(&mut player);
        assert_eq!(
            residence.upgrade("MerchantUpgrade", &mut ctx),
            PromotionOutcome::UnknownRule
        );
        assert_eq!(residence.tier(), ResidentTier::Peasant);
    }

    #[test]
    fn promotions_never_go_backwards() {
        let mut residence = residence(ResidentTier::Citizen, 15).with_residents(15);
        let map = FakeMap::reaching(&[]);
        let mut player = rich_player();
        let mut ctx = Neighbourhood::new(&map).with_owner(&mut player);

        assert_eq!(
            residence.upgrade("CitizenUpgrade", &mut ctx),
            PromotionOutcome::NotAnUpgrade
        );
        assert_eq!(residence.tier(), ResidentTier::Citizen);
    }

    #[test]
    fn full_satisfied_residence_promotes_itself() {
        let mut residence = residence(ResidentTier::Peasant, 10).with_residents(10);
        let map = FakeMap::reaching(&[BuildingCategory::TownCenter]);
        let mut hub = FakeHub::stocking(&[Resource::Fish, Resource::Cider]);
        let mut player = rich_player();
        let mut ctx = Neighbourhood::new(&map)
            .with_hub(&mut hub)
            .with_owner(&mut player);

        let (_, promotion) = residence.update_satisfaction(&mut ctx);

        assert_eq!(
            promotion,
            Some(PromotionOutcome::Promoted {
                from: ResidentTier::Peasant,
                to: ResidentTier::Citizen
            })
        );
        drop(ctx);
        assert_eq!(player.available_promotions(ResidentTier::Citizen), 2);
    }

    #[test]
    fn promotion_waits_for_owner_quota_and_slots() {
        let map = FakeMap::reaching(&[BuildingCategory::TownCenter]);
        let mut hub = FakeHub::stocking(&[Resource::Fish, Resource::Cider]);

        let mut residence = residence(ResidentTier::Peasant, 10).with_residents(10);
        let mut few_peasants = rich_player();
        few_peasants.population.insert(ResidentTier::Peasant, 89);
        let mut ctx = Neighbourhood::new(&map)
            .with_hub(&mut hub)
            .with_owner(&mut few_peasants);
        assert_eq!(residence.update_satisfaction(&mut ctx).1, None);

        let mut no_slots = rich_player().with_promotion_slots(ResidentTier::Citizen, 0);
        let mut ctx = Neighbourhood::new(&map)
            .with_hub(&mut hub)
            .with_owner(&mut no_slots);
        assert_eq!(residence.update_satisfaction(&mut ctx).1, None);
        assert_eq!(residence.tier(), ResidentTier::Peasant);
    }

    #[test]
    fn residence_below_capacity_is_not_promoted() {
        let mut residence = residence(ResidentTier::Peasant, 10).with_residents(9);
        let map = FakeMap::reaching(&[BuildingCategory::TownCenter]);
        let mut hub = FakeHub::stocking(&[Resource::Fish, Resource::Cider]);
        let mut player = rich_player();
        let mut ctx = Neighbourhood::new(&map)
            .with_hub(&mut hub)
            .with_owner(&mut player);

        assert_eq!(residence.update_satisfaction(&mut ctx).1, None);
    }
}
