/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use config::GameConfig;
use domain::grid::Direction;
use domain::rng::SeededRandom;
use sim::backend::Backend;
use sim::catalog::{self, LevelInfo};
use sim::event::GameEvent;
use ui::gamepad::{GamepadState, PadAction};
use ui::input::{Command, InputState};
use ui::renderer::Renderer;
use ui::sound::{self, SoundEngine};

/// Repeat rate while a direction is held.
const WALK_REPEAT: Duration = Duration::from_millis(150);
/// How long a HUD message stays up.
const MESSAGE_TIME: Duration = Duration::from_secs(3);

fn main() {
    let config = GameConfig::load();

    let _log_guard = match logging::init(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e}");
            None
        }
    };

    let rng = SeededRandom::from_optional_seed(config.simulation.seed);
    let seed = rng.seed();
    let mut game = Backend::new(config.data_dir.clone(), &config.simulation, Box::new(rng));
    let levels = catalog::scan(&config.data_dir);

    if let Err(e) = start(&mut game, &levels, config.start_level) {
        tracing::error!("No playable level: {}", e);
        eprintln!("No playable level in {}: {e}", config.data_dir.display());
        return;
    }

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut game, &levels, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        tracing::error!("Game error: {}", e);
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing GameOne! (seed {seed})");
    if let Some(inv) = game.inventory() {
        for slot in inv.slots() {
            println!("  {} ×{}", slot.item.name, slot.amount);
        }
    }
}

/// Load the configured start level, else the first level found on disk.
fn start(game: &mut Backend, levels: &[LevelInfo], index: u32) -> error::Result<()> {
    let first_error = match game.load_level(index) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    tracing::warn!("Start level {} unavailable: {}", index, first_error);
    match levels.first() {
        Some(info) => {
            tracing::info!("Falling back to level {} \"{}\" ({})", info.index, info.name, info.path.display());
            game.load_level(info.index)
        }
        None => Err(first_error),
    }
}

/// Text under the map, cleared after `MESSAGE_TIME`.
struct Message {
    text: String,
    shown: Instant,
}

impl Message {
    fn new() -> Self {
        Message { text: String::new(), shown: Instant::now() }
    }

    fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.shown = Instant::now();
    }

    fn current(&mut self) -> &str {
        if !self.text.is_empty() && self.shown.elapsed() >= MESSAGE_TIME {
            self.text.clear();
        }
        &self.text
    }
}

fn game_loop(
    game: &mut Backend,
    levels: &[LevelInfo],
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new(&config.gamepad);
    let mut pad_last_step: Option<Instant> = None;
    let mut message = Message::new();
    let frame_sleep = Duration::from_millis(config.simulation.frame_sleep_ms);
    let mut last_frame = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        let mut commands = kb.commands();
        commands.extend(pad_commands(&gp, game));
        if commands.contains(&Command::Quit) {
            break;
        }
        for command in commands {
            run_command(game, levels, command, &mut message);
        }

        let pad_dir = pad_direction(&gp, &mut pad_last_step);
        if let Some(dir) = kb.step_direction(WALK_REPEAT).or(pad_dir) {
            game.move_player(dir);
        }

        let now = Instant::now();
        game.advance(now.duration_since(last_frame));
        last_frame = now;

        let player = game.player_id();
        for event in game.take_events() {
            if let (Some(sfx), Some(effect)) = (sound, sound::effect_for(&event, player)) {
                sfx.play(effect);
            }
            if let Some(text) = describe(&event, player) {
                message.set(text);
            }
        }

        renderer.render(game, message.current())?;
        std::thread::sleep(frame_sleep);
    }

    Ok(())
}

fn run_command(game: &mut Backend, levels: &[LevelInfo], command: Command, message: &mut Message) {
    let result = match command {
        Command::Respawn => {
            game.respawn();
            Ok(())
        }
        Command::Restart => game.reload(),
        Command::NextLevel | Command::PreviousLevel => {
            let current = game.level_index().unwrap_or(0);
            let target = if command == Command::NextLevel {
                catalog::next_index(levels, current)
            } else {
                catalog::previous_index(levels, current)
            };
            match target {
                Some(index) => game.load_level(index),
                None => Ok(()),
            }
        }
        Command::Move(_) | Command::Quit => Ok(()),
    };
    if let Err(e) = result {
        tracing::warn!("{:?} failed: {}", command, e);
        message.set(format!("{e}"));
    }
}

/// Gamepad buttons mapped onto keyboard commands. Confirm respawns only
/// after the player went down.
fn pad_commands(gp: &GamepadState, game: &Backend) -> Vec<Command> {
    let mut out = Vec::new();
    if gp.pressed(PadAction::Cancel) {
        out.push(Command::Quit);
    }
    if gp.pressed(PadAction::Restart) {
        out.push(Command::Restart);
    }
    let down = game.player().map_or(false, |p| !p.is_alive());
    if gp.pressed(PadAction::Respawn) || (down && gp.pressed(PadAction::Confirm)) {
        out.push(Command::Respawn);
    }
    out
}

fn pad_direction(gp: &GamepadState, last_step: &mut Option<Instant>) -> Option<Direction> {
    let now = Instant::now();
    if let Some(dir) = gp.fresh_direction() {
        *last_step = Some(now);
        return Some(dir);
    }
    let dir = gp.held_direction()?;
    if last_step.map_or(true, |t| now.duration_since(t) >= WALK_REPEAT) {
        *last_step = Some(now);
        Some(dir)
    } else {
        None
    }
}

fn describe(event: &GameEvent, player: Option<domain::actor::ActorId>) -> Option<String> {
    match event {
        GameEvent::PositionChanged { actor, position } if Some(*actor) == player => {
            tracing::trace!("Player at {}", position);
            None
        }
        GameEvent::Attacked { attacker, target, bonus } => {
            tracing::debug!("{:?} hit {:?}, bonus {}", attacker, target, bonus);
            match (Some(*attacker) == player, *bonus) {
                (true, b) if b > 0 => Some(format!("Hit! +{b} energy")),
                _ => None,
            }
        }
        GameEvent::EnergyChanged { actor, energy } if Some(*actor) == player && *energy == 0 => {
            Some("Out of energy".to_string())
        }
        GameEvent::LevelLoaded { name } => Some(format!("Entering {name}")),
        GameEvent::InventoryChanged { item, amount } => Some(format!("Found {item}, now {amount}")),
        GameEvent::Teleported { position } => Some(format!("Ladder to {position}")),
        GameEvent::LivesChanged { actor, lives } if Some(*actor) == player && *lives > 0 => {
            Some(format!("Knocked out, {lives} left. Space to respawn"))
        }
        GameEvent::PlayerDefeated => Some("Defeated. R restarts the level".to_string()),
        _ => None,
    }
}
