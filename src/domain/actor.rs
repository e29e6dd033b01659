/// Actors: everything that occupies a tile and has energy.
///
/// One struct for all kinds, with kind-specific state in `ActorKind`.
/// Capabilities (who may attack whom, who acts on ticks) are answered by
/// `ActorTag` so there is a single table to read.
///
/// Actors never reach back into the world. Anything that needs the map or
/// the rest of the roster (moving, bonuses, ladders) goes through the
/// backend, which addresses actors by `ActorId`.

use super::ai::MoveScript;
use super::grid::Point;
use super::inventory::{Inventory, ItemKind};
use super::rng::RandomSource;

/// Index into the backend's actor arena. Valid until the next level load.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ActorId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActorTag {
    Player,
    Enemy,
    Tentaklon,
    Chest,
    Ladder,
    Shop,
}

impl ActorTag {
    pub fn name(self) -> &'static str {
        match self {
            ActorTag::Player    => "Player",
            ActorTag::Enemy     => "Enemy",
            ActorTag::Tentaklon => "Tentaklon",
            ActorTag::Chest     => "Chest",
            ActorTag::Ladder    => "Ladder",
            ActorTag::Shop      => "Shop",
        }
    }

    /// Capability table. Players hit anything that is not a player,
    /// enemies hit only the player, items never attack.
    pub fn can_attack(self, opponent: ActorTag) -> bool {
        match self {
            ActorTag::Player => opponent != ActorTag::Player,
            ActorTag::Enemy | ActorTag::Tentaklon => opponent == ActorTag::Player,
            ActorTag::Chest | ActorTag::Ladder | ActorTag::Shop => false,
        }
    }

    /// Driven by the action timer.
    pub fn is_autonomous(self) -> bool {
        matches!(self, ActorTag::Enemy | ActorTag::Tentaklon)
    }
}

/// Where a ladder leads.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LadderTarget {
    /// Teleport within the current map.
    SameLevel,
    /// Load `<index>.level.json`.
    Level(u32),
}

#[derive(Clone, Debug)]
pub enum ActorKind {
    Player { inventory: Inventory },
    Enemy,
    Tentaklon { script: MoveScript },
    Chest { item: ItemKind, amount: u32 },
    Ladder { target: LadderTarget, destination: Point },
    Shop,
}

impl ActorKind {
    pub fn tag(&self) -> ActorTag {
        match self {
            ActorKind::Player { .. }    => ActorTag::Player,
            ActorKind::Enemy            => ActorTag::Enemy,
            ActorKind::Tentaklon { .. } => ActorTag::Tentaklon,
            ActorKind::Chest { .. }     => ActorTag::Chest,
            ActorKind::Ladder { .. }    => ActorTag::Ladder,
            ActorKind::Shop             => ActorTag::Shop,
        }
    }
}

// ── Energy tiers ──

/// Visual override that applies at or above `fraction * maximumEnergy`.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyLevel {
    pub fraction: f64,
    pub image: String,
    pub image_count: u32,
}

/// Sort tiers so `energy_tier` can take the first match.
pub fn sort_energy_levels(levels: &mut [EnergyLevel]) {
    levels.sort_by(|a, b| b.fraction.total_cmp(&a.fraction));
}

/// Index of the first tier (sorted by descending fraction) that the current
/// energy reaches.
pub fn energy_tier(energy: i32, maximum: i32, levels: &[EnergyLevel]) -> Option<usize> {
    levels.iter().position(|level| f64::from(energy) >= level.fraction * f64::from(maximum))
}

/// Visual metadata taken from the level description.
#[derive(Clone, Debug, Default)]
pub struct Appearance {
    pub image: String,
    pub image_count: u32,
    pub color: String,
    pub energy_levels: Vec<EnergyLevel>,
}

/// Result of an energy change.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct EnergyChange {
    pub changed: bool,
    pub life_lost: bool,
}

// ══════════════════════════════════════════════════════════════
// Actor
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Actor {
    pub name: String,
    /// Display type; usually the tag name, items may override it.
    pub type_name: String,
    pub kind: ActorKind,
    origin: Point,
    position: Point,
    energy: i32,
    minimum_energy: i32,
    maximum_energy: i32,
    lives: u32,
    maximum_lives: u32,
    pub appearance: Appearance,
}

impl Actor {
    /// New actor at full energy and lives. `maximum_energy` and
    /// `maximum_lives` are raised to at least 1.
    pub fn new(
        name: impl Into<String>,
        kind: ActorKind,
        origin: Point,
        minimum_energy: i32,
        maximum_energy: i32,
        maximum_lives: u32,
    ) -> Self {
        let maximum_energy = maximum_energy.max(1);
        let maximum_lives = maximum_lives.max(1);
        Actor {
            name: name.into(),
            type_name: kind.tag().name().to_string(),
            kind,
            origin,
            position: origin,
            energy: maximum_energy,
            minimum_energy: minimum_energy.min(maximum_energy),
            maximum_energy,
            lives: maximum_lives,
            maximum_lives,
            appearance: Appearance::default(),
        }
    }

    pub fn with_appearance(mut self, mut appearance: Appearance) -> Self {
        sort_energy_levels(&mut appearance.energy_levels);
        self.appearance = appearance;
        self
    }

    pub fn tag(&self) -> ActorTag {
        self.kind.tag()
    }

    pub fn origin(&self) -> Point { self.origin }
    pub fn position(&self) -> Point { self.position }
    pub fn energy(&self) -> i32 { self.energy }
    #[cfg(test)]
    pub fn minimum_energy(&self) -> i32 { self.minimum_energy }
    pub fn maximum_energy(&self) -> i32 { self.maximum_energy }
    pub fn lives(&self) -> u32 { self.lives }
    pub fn maximum_lives(&self) -> u32 { self.maximum_lives }

    pub fn is_alive(&self) -> bool {
        self.lives > 0 && self.energy > 0
    }

    /// Already at its energy floor; no longer obstructs movement.
    pub fn is_depleted(&self) -> bool {
        self.energy == self.minimum_energy
    }

    /// Direct placement, no legality check.
    pub fn place(&mut self, destination: Point) {
        self.position = destination;
    }

    fn set_energy(&mut self, energy: i32) -> EnergyChange {
        if energy == self.energy {
            return EnergyChange::default();
        }
        self.energy = energy;
        let life_lost = energy == 0 && self.die();
        EnergyChange { changed: true, life_lost }
    }

    pub fn steal_energy(&mut self, amount: i32) -> EnergyChange {
        self.set_energy((self.energy - amount).max(self.minimum_energy))
    }

    pub fn give_energy(&mut self, amount: i32) -> EnergyChange {
        self.set_energy((self.energy + amount).min(self.maximum_energy))
    }

    /// Lose one life. Returns false when no life was left to lose.
    pub fn die(&mut self) -> bool {
        if self.lives == 0 {
            return false;
        }
        self.lives -= 1;
        true
    }

    /// Back to the spawn point at full energy. Lives are not restored.
    pub fn respawn(&mut self) -> EnergyChange {
        self.position = self.origin;
        self.set_energy(self.maximum_energy)
    }

    pub fn can_attack(&self, opponent: &Actor) -> bool {
        self.tag().can_attack(opponent.tag())
    }

    /// Hit `opponent` for one energy point. Returns the bonus the attacker
    /// earned, 0 or 1, or 0 without effect when the attack is not allowed.
    pub fn attack(&self, opponent: &mut Actor, rng: &mut dyn RandomSource) -> i32 {
        if !self.can_attack(opponent) {
            return 0;
        }
        opponent.steal_energy(1);
        rng.below(2) as i32
    }

    // ── Kind accessors ──

    pub fn inventory(&self) -> Option<&Inventory> {
        match &self.kind {
            ActorKind::Player { inventory } => Some(inventory),
            _ => None,
        }
    }

    pub fn inventory_mut(&mut self) -> Option<&mut Inventory> {
        match &mut self.kind {
            ActorKind::Player { inventory } => Some(inventory),
            _ => None,
        }
    }

    /// Take the chest's remaining stack, leaving it empty.
    pub fn take_loot(&mut self) -> Option<(ItemKind, u32)> {
        match &mut self.kind {
            ActorKind::Chest { item, amount } => Some((item.clone(), std::mem::take(amount))),
            _ => None,
        }
    }

    // ── Visuals ──

    fn current_tier(&self) -> Option<&EnergyLevel> {
        energy_tier(self.energy, self.maximum_energy, &self.appearance.energy_levels)
            .map(|i| &self.appearance.energy_levels[i])
    }

    pub fn image(&self) -> &str {
        match self.current_tier() {
            Some(level) if !level.image.is_empty() => &level.image,
            _ => &self.appearance.image,
        }
    }

    pub fn image_count(&self) -> u32 {
        match self.current_tier() {
            Some(level) if level.image_count > 0 => level.image_count,
            _ => self.appearance.image_count,
        }
    }

    /// Animation frame at `tick`; always 0 for single-image actors.
    pub fn frame(&self, tick: u64) -> u32 {
        match self.image_count() {
            0 | 1 => 0,
            n => (tick % u64::from(n)) as u32,
        }
    }
}

/// Borrow two distinct arena entries mutably.
pub fn pair_mut(actors: &mut [Actor], a: ActorId, b: ActorId) -> Option<(&mut Actor, &mut Actor)> {
    if a == b || a.0 >= actors.len() || b.0 >= actors.len() {
        return None;
    }
    if a.0 < b.0 {
        let (lo, hi) = actors.split_at_mut(b.0);
        Some((&mut lo[a.0], &mut hi[0]))
    } else {
        let (lo, hi) = actors.split_at_mut(a.0);
        Some((&mut hi[0], &mut lo[b.0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rng::Scripted;

    fn enemy(energy: i32) -> Actor {
        Actor::new("Orc", ActorKind::Enemy, Point::new(6, 5), 0, energy, 1)
    }

    fn player() -> Actor {
        Actor::new("Hero", ActorKind::Player { inventory: Inventory::new() }, Point::new(5, 5), 0, 3, 3)
    }

    fn chest() -> Actor {
        let kind = ActorKind::Chest { item: ItemKind::lookup("Arrow"), amount: 3 };
        Actor::new("Chest", kind, Point::new(1, 1), 1, 2, 1)
    }

    #[test]
    fn capability_table() {
        use ActorTag::*;
        for other in [Enemy, Tentaklon, Chest, Ladder, Shop] {
            assert!(Player.can_attack(other));
            assert!(!other.can_attack(Enemy));
        }
        assert!(!Player.can_attack(Player));
        assert!(Enemy.can_attack(Player));
        assert!(Tentaklon.can_attack(Player));
        assert!(!Chest.can_attack(Player));
        assert!(!Shop.can_attack(Player));
    }

    #[test]
    fn maxima_are_at_least_one() {
        let a = Actor::new("x", ActorKind::Enemy, Point::default(), 0, 0, 0);
        assert_eq!(a.maximum_energy(), 1);
        assert_eq!(a.maximum_lives(), 1);
        assert!(a.is_alive());
    }

    #[test]
    fn steal_clamps_at_floor_and_costs_one_life() {
        let mut a = enemy(2);
        assert_eq!(a.steal_energy(5), EnergyChange { changed: true, life_lost: true });
        assert_eq!(a.energy(), 0);
        assert_eq!(a.lives(), 0);
        assert!(!a.is_alive());
        // Already at the floor: no change, no second life lost.
        assert_eq!(a.steal_energy(1), EnergyChange::default());
        assert_eq!(a.lives(), 0);
    }

    #[test]
    fn nonzero_floor_never_dies() {
        let mut c = chest();
        c.steal_energy(10);
        assert_eq!(c.energy(), 1);
        assert_eq!(c.lives(), 1);
        assert!(c.is_depleted());
    }

    #[test]
    fn give_clamps_at_maximum() {
        let mut p = player();
        p.steal_energy(1);
        p.give_energy(10);
        assert_eq!(p.energy(), 3);
        assert!(!p.give_energy(1).changed);
    }

    #[test]
    fn respawn_restores_energy_not_lives() {
        let mut p = player();
        p.place(Point::new(9, 9));
        p.steal_energy(3);
        assert_eq!(p.lives(), 2);
        p.respawn();
        assert_eq!(p.position(), Point::new(5, 5));
        assert_eq!(p.energy(), 3);
        assert_eq!(p.lives(), 2);
    }

    #[test]
    fn attack_costs_one_energy_and_returns_roll() {
        let p = player();
        let mut e = enemy(3);
        let mut rng = Scripted::new(&[1]);
        assert_eq!(p.attack(&mut e, &mut rng), 1);
        assert_eq!(e.energy(), 2);
    }

    #[test]
    fn disallowed_attack_has_no_effect() {
        let c = chest();
        let mut p = player();
        let mut rng = Scripted::new(&[1]);
        assert_eq!(c.attack(&mut p, &mut rng), 0);
        assert_eq!(p.energy(), 3);
    }

    #[test]
    fn chest_loot_is_taken_once() {
        let mut c = chest();
        let (item, amount) = c.take_loot().unwrap();
        assert_eq!((item.id.as_str(), amount), ("Arrow", 3));
        assert_eq!(c.take_loot().unwrap().1, 0);
        assert!(enemy(1).take_loot().is_none());
    }

    #[test]
    fn energy_tier_picks_first_reached_threshold() {
        let mut levels = vec![
            EnergyLevel { fraction: 0.25, image: "weak".into(), image_count: 0 },
            EnergyLevel { fraction: 0.75, image: "strong".into(), image_count: 4 },
        ];
        sort_energy_levels(&mut levels);
        assert_eq!(energy_tier(4, 4, &levels), Some(0));
        assert_eq!(energy_tier(2, 4, &levels), Some(1));
        assert_eq!(energy_tier(0, 4, &levels), None);
    }

    #[test]
    fn tier_overrides_image_when_set() {
        let appearance = Appearance {
            image: "base".into(),
            image_count: 2,
            energy_levels: vec![EnergyLevel { fraction: 0.5, image: "healthy".into(), image_count: 0 }],
            ..Appearance::default()
        };
        let mut e = enemy(4).with_appearance(appearance);
        assert_eq!((e.image(), e.image_count()), ("healthy", 2));
        e.steal_energy(3);
        assert_eq!(e.image(), "base");
    }

    #[test]
    fn frame_cycles_through_image_count() {
        let appearance = Appearance { image_count: 3, ..Appearance::default() };
        let e = enemy(4).with_appearance(appearance);
        assert_eq!([e.frame(0), e.frame(1), e.frame(5)], [0, 1, 2]);
        assert_eq!(enemy(4).frame(7), 0);
    }

    #[test]
    fn pair_mut_borrows_both_orders() {
        let mut actors = vec![player(), enemy(3)];
        let (b, a) = pair_mut(&mut actors, ActorId(1), ActorId(0)).unwrap();
        assert_eq!(b.tag(), ActorTag::Enemy);
        assert_eq!(a.tag(), ActorTag::Player);
        assert!(pair_mut(&mut actors, ActorId(0), ActorId(0)).is_none());
    }
}
