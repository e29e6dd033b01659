/// Backend: the running game.
///
/// Owns the map, the actor arena (player included) and the random source,
/// and is the only place where actors change. Every move, whether from the
/// player or from an enemy's tick, goes through `can_move_to`:
///
///   1. dead actors never move
///   2. the destination must be on the map
///   3. the destination tile must be walkable
///   4. the first other live actor on the destination decides the rest:
///        - already at its energy floor: passable
///        - attackable: attack, hand the bonus to the occupant, stay put
///        - otherwise: blocked
///   5. free tiles are entered
///
/// ## Timers
///   - action timer: lets enemies act. Starts with the player's first move
///     attempt, stops on life loss, respawn and level load.
///   - ticks timer: free-running counter for animation.
///
/// Both are driven by `advance(dt)` from the frame loop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::SimulationConfig;
use crate::domain::actor::{pair_mut, Actor, ActorId, ActorKind, ActorTag, EnergyChange, LadderTarget};
use crate::domain::ai::chase_step;
use crate::domain::grid::{Direction, Point};
use crate::domain::inventory::Inventory;
use crate::domain::map::{Map, MapFormat};
use crate::domain::rng::RandomSource;
use crate::error::{LoadError, Result};
use crate::sim::event::GameEvent;
use crate::sim::level::{self, Level, DEFAULT_LEVEL};
use crate::sim::timer::IntervalTimer;

pub struct Backend {
    data_dir: PathBuf,
    map: Map,
    actors: Vec<Actor>,
    player: Option<ActorId>,
    level_name: String,
    level_file: Option<PathBuf>,
    level_index: Option<u32>,
    rng: Box<dyn RandomSource>,
    action_timer: IntervalTimer,
    ticks_timer: IntervalTimer,
    ticks: u64,
    events: Vec<GameEvent>,
}

impl Backend {
    pub fn new(data_dir: PathBuf, sim: &SimulationConfig, rng: Box<dyn RandomSource>) -> Self {
        let mut ticks_timer = IntervalTimer::new(sim.ticks_interval);
        ticks_timer.start();
        Backend {
            data_dir,
            map: Map::default(),
            actors: vec![],
            player: None,
            level_name: String::new(),
            level_file: None,
            level_index: None,
            rng,
            action_timer: IntervalTimer::new(sim.action_interval),
            ticks_timer,
            ticks: 0,
            events: vec![],
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Loading
    // ══════════════════════════════════════════════════════════════

    /// Load a level description (`*.json`) or a bare legacy map (`*.txt`,
    /// placed over the default level). `spawn` overrides the player's start.
    /// On failure the current game is left untouched.
    pub fn load(&mut self, file: impl AsRef<Path>, spawn: Option<Point>) -> Result<()> {
        self.action_timer.stop();
        let (level, warnings) = self.read_level(file.as_ref(), spawn)?;
        if warnings > 0 {
            tracing::info!("{}: {} start position warning(s)", level.file.display(), warnings);
        }
        self.install(level);
        Ok(())
    }

    /// Build and validate a level without touching the running game.
    /// Actors are checked against the map their description names, before
    /// a `.txt` map replaces it.
    fn read_level(&self, file: &Path, spawn: Option<Point>) -> Result<(Level, usize)> {
        let name = file.to_string_lossy();
        if name.ends_with(".json") {
            let mut level = level::load_level_file(&self.data_dir, file, spawn)?;
            let warnings = level::validate_actors(&mut level.map, &level.actors, &level.file, &level.map_file);
            Ok((level, warnings))
        } else if name.ends_with(".txt") {
            let default_file = level::level_file_name(DEFAULT_LEVEL);
            let mut level = level::load_level_file(&self.data_dir, Path::new(&default_file), spawn)?;
            let warnings = level::validate_actors(&mut level.map, &level.actors, &level.file, &level.map_file);
            let map_file = self.data_dir.join(file);
            level.map = Map::from_file(&map_file, MapFormat::Legacy)?;
            level.map_file = map_file;
            Ok((level, warnings))
        } else {
            tracing::warn!("Unsupported level file: {}", file.display());
            Err(LoadError::UnsupportedFile(name.into_owned()))
        }
    }

    pub fn load_level(&mut self, index: u32) -> Result<()> {
        self.load(level::level_file_name(index), None)
    }

    /// Load the current level file again from scratch.
    pub fn reload(&mut self) -> Result<()> {
        match self.level_file.clone() {
            Some(file) => self.load(file, None),
            None => self.load_level(DEFAULT_LEVEL),
        }
    }

    fn install(&mut self, level: Level) {
        tracing::info!(
            "Level \"{}\" loaded: {}x{} tiles, {} actors",
            level.name, level.map.columns(), level.map.rows(), level.actors.len(),
        );

        self.level_index = level_index_of(&level.file);
        self.map = level.map;
        self.actors = level.actors;
        self.player = self.actors.iter()
            .rposition(|a| a.tag() == ActorTag::Player)
            .map(ActorId);
        self.level_name = level.name;
        self.level_file = Some(level.file);
        self.action_timer.stop();
        self.events.push(GameEvent::LevelLoaded { name: self.level_name.clone() });
    }

    /// Player back to its start at full energy.
    pub fn respawn(&mut self) {
        if let Some(id) = self.player {
            let change = self.actors[id.0].respawn();
            let position = self.actors[id.0].position();
            self.events.push(GameEvent::PositionChanged { actor: id, position });
            self.note_energy(id, change);
        }
        self.action_timer.stop();
    }

    // ══════════════════════════════════════════════════════════════
    // Queries
    // ══════════════════════════════════════════════════════════════

    pub fn columns(&self) -> usize { self.map.columns() }
    pub fn rows(&self) -> usize { self.map.rows() }
    pub fn map(&self) -> &Map { &self.map }
    pub fn actors(&self) -> &[Actor] { &self.actors }
    pub fn level_name(&self) -> &str { &self.level_name }
    pub fn level_index(&self) -> Option<u32> { self.level_index }

    pub fn player_id(&self) -> Option<ActorId> {
        self.player
    }

    pub fn player(&self) -> Option<&Actor> {
        self.player.and_then(|id| self.actors.get(id.0))
    }

    pub fn inventory(&self) -> Option<&Inventory> {
        self.player().and_then(Actor::inventory)
    }

    /// Coarse elapsed ticks since startup.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_action_timer_running(&self) -> bool {
        self.action_timer.is_running()
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // ══════════════════════════════════════════════════════════════
    // Movement
    // ══════════════════════════════════════════════════════════════

    /// May `id` enter `destination`? Bumping into an attackable actor
    /// resolves the attack here and answers false.
    pub fn can_move_to(&mut self, id: ActorId, destination: Point) -> bool {
        if Some(id) == self.player && !self.action_timer.is_running() {
            self.action_timer.start();
        }

        let Some(actor) = self.actors.get(id.0) else { return false };
        if !actor.is_alive() {
            return false;
        }
        if !self.map.contains(destination) || !self.map.is_walkable(destination) {
            return false;
        }

        let Some(occupant) = self.occupant_of(destination, id) else {
            return true;
        };
        if self.actors[occupant.0].is_depleted() {
            return true;
        }
        if self.actors[id.0].can_attack(&self.actors[occupant.0]) {
            self.resolve_attack(id, occupant);
        }
        false
    }

    /// Move `id` to `destination` if allowed.
    pub fn try_move(&mut self, id: ActorId, destination: Point) -> bool {
        if !self.can_move_to(id, destination) {
            return false;
        }
        let Some(actor) = self.actors.get_mut(id.0) else { return false };
        actor.place(destination);
        self.events.push(GameEvent::PositionChanged { actor: id, position: destination });
        true
    }

    pub fn move_actor(&mut self, id: ActorId, dir: Direction) -> bool {
        match self.actors.get(id.0) {
            Some(actor) => {
                let destination = actor.position().step(dir);
                self.try_move(id, destination)
            }
            None => false,
        }
    }

    pub fn move_left(&mut self, id: ActorId) -> bool { self.move_actor(id, Direction::Left) }
    pub fn move_up(&mut self, id: ActorId) -> bool { self.move_actor(id, Direction::Up) }
    pub fn move_right(&mut self, id: ActorId) -> bool { self.move_actor(id, Direction::Right) }
    pub fn move_down(&mut self, id: ActorId) -> bool { self.move_actor(id, Direction::Down) }

    pub fn move_player(&mut self, dir: Direction) -> bool {
        let Some(id) = self.player else { return false };
        match dir {
            Direction::Left  => self.move_left(id),
            Direction::Up    => self.move_up(id),
            Direction::Right => self.move_right(id),
            Direction::Down  => self.move_down(id),
        }
    }

    /// First live actor other than `except` standing on `p`.
    fn occupant_of(&self, p: Point, except: ActorId) -> Option<ActorId> {
        self.actors.iter()
            .enumerate()
            .find(|(i, a)| *i != except.0 && a.is_alive() && a.position() == p)
            .map(|(i, _)| ActorId(i))
    }

    /// Side-effect-free version of `can_move_to`, for planning.
    fn is_free(&self, id: ActorId, p: Point) -> bool {
        let alive = self.actors.get(id.0).map_or(false, Actor::is_alive);
        alive
            && self.map.is_walkable(p)
            && self.occupant_of(p, id).map_or(true, |o| self.actors[o.0].is_depleted())
    }

    // ══════════════════════════════════════════════════════════════
    // Combat and bonuses
    // ══════════════════════════════════════════════════════════════

    fn resolve_attack(&mut self, attacker: ActorId, target: ActorId) {
        let lives_before = self.actors[target.0].lives();
        let energy_before = self.actors[target.0].energy();

        let bonus = match pair_mut(&mut self.actors, attacker, target) {
            Some((a, t)) => a.attack(t, self.rng.as_mut()),
            None => return,
        };

        let t = &self.actors[target.0];
        tracing::debug!(
            "{} \"{}\" hits {} \"{}\": energy {} -> {}, bonus {}",
            self.actors[attacker.0].type_name, self.actors[attacker.0].name,
            t.type_name, t.name, energy_before, t.energy(), bonus,
        );

        let change = EnergyChange {
            changed: t.energy() != energy_before,
            life_lost: t.lives() != lives_before,
        };
        self.events.push(GameEvent::Attacked { attacker, target, bonus });
        self.note_energy(target, change);

        self.give_bonus(target, attacker, bonus);
    }

    /// React to `mover` bumping into `occupant`.
    fn give_bonus(&mut self, occupant: ActorId, mover: ActorId, amount: i32) {
        match self.actors[occupant.0].tag() {
            ActorTag::Chest => self.open_chest(occupant, mover),
            ActorTag::Ladder => {
                if let ActorKind::Ladder { target, destination } = self.actors[occupant.0].kind {
                    self.climb(target, destination);
                }
            }
            ActorTag::Shop => {}
            ActorTag::Player | ActorTag::Enemy | ActorTag::Tentaklon => {
                let change = self.actors[mover.0].give_energy(amount);
                self.note_energy(mover, change);
            }
        }
    }

    fn open_chest(&mut self, chest: ActorId, mover: ActorId) {
        if Some(mover) != self.player {
            return;
        }
        let Some((item, amount)) = self.actors[chest.0].take_loot() else { return };
        if amount == 0 {
            return;
        }
        if let Some(inventory) = self.actors[mover.0].inventory_mut() {
            let total = inventory.update_item(&item, amount);
            tracing::info!("Picked up {} x {} ({} total)", amount, item.name, total);
            self.events.push(GameEvent::InventoryChanged { item: item.id, amount: total });
        }
    }

    fn climb(&mut self, target: LadderTarget, destination: Point) {
        match target {
            LadderTarget::SameLevel => {
                let Some(id) = self.player else { return };
                if !self.map.contains(destination) {
                    tracing::warn!("Ladder destination {} is outside the map", destination);
                }
                self.actors[id.0].place(destination);
                tracing::info!("Teleported to {}", destination);
                self.events.push(GameEvent::Teleported { position: destination });
                self.events.push(GameEvent::PositionChanged { actor: id, position: destination });
            }
            LadderTarget::Level(index) => {
                if let Err(e) = self.load(level::level_file_name(index), Some(destination)) {
                    tracing::warn!("Ladder to level {} failed: {}", index, e);
                }
            }
        }
    }

    fn note_energy(&mut self, id: ActorId, change: EnergyChange) {
        let actor = &self.actors[id.0];
        if change.changed {
            self.events.push(GameEvent::EnergyChanged { actor: id, energy: actor.energy() });
        }
        if change.life_lost {
            let lives = actor.lives();
            tracing::info!("{} \"{}\" lost a life, {} left", actor.type_name, actor.name, lives);
            self.events.push(GameEvent::LivesChanged { actor: id, lives });
            if Some(id) == self.player {
                self.action_timer.stop();
                if lives == 0 {
                    self.events.push(GameEvent::PlayerDefeated);
                }
            }
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Ticks
    // ══════════════════════════════════════════════════════════════

    /// One action round: every enemy acts, in roster order.
    pub fn tick(&mut self) {
        let autonomous: Vec<ActorId> = self.actors.iter()
            .enumerate()
            .filter(|(_, a)| a.tag().is_autonomous())
            .map(|(i, _)| ActorId(i))
            .collect();

        for id in autonomous {
            self.act(id);
        }
    }

    fn act(&mut self, id: ActorId) {
        let Some(target) = self.player().map(Actor::position) else { return };
        let actor = &self.actors[id.0];
        if !actor.is_alive() {
            return;
        }
        let position = actor.position();

        let dir = match actor.tag() {
            ActorTag::Enemy => chase_step(self.rng.as_mut(), position, target),
            ActorTag::Tentaklon => self.script_step(id),
            _ => None,
        };

        if let Some(dir) = dir {
            self.try_move(id, position.step(dir));
        }
    }

    fn script_step(&mut self, id: ActorId) -> Option<Direction> {
        let mut script = match &self.actors[id.0].kind {
            ActorKind::Tentaklon { script } => *script,
            _ => return None,
        };
        let dir = script.next_step(|p| self.is_free(id, p));
        if let ActorKind::Tentaklon { script: stored } = &mut self.actors[id.0].kind {
            *stored = script;
        }
        dir
    }

    /// Feed elapsed frame time to both timers.
    pub fn advance(&mut self, dt: Duration) {
        self.ticks += u64::from(self.ticks_timer.advance(dt));

        let fired = self.action_timer.advance(dt);
        for _ in 0..fired {
            if !self.action_timer.is_running() {
                break;
            }
            self.tick();
        }
    }
}

/// `7.level.json` -> `Some(7)`.
fn level_index_of(file: &Path) -> Option<u32> {
    file.file_name()?.to_str()?.strip_suffix(".level.json")?.parse().ok()
}
