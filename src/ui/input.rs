/// Keyboard input.
///
/// Tracks which keys are held so that walking repeats while a key stays
/// down, and separates one-shot commands (respawn, restart, level switch)
/// which fire only on the initial press.
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::grid::Direction;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Move(Direction),
    Respawn,
    Restart,
    NextLevel,
    PreviousLevel,
    Quit,
}

/// Key bindings.
pub fn command_for(code: KeyCode) -> Option<Command> {
    match code {
        KeyCode::Left  | KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Char('h') => Some(Command::Move(Direction::Left)),
        KeyCode::Up    | KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Char('k') => Some(Command::Move(Direction::Up)),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Char('l') => Some(Command::Move(Direction::Right)),
        KeyCode::Down  | KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char('j') => Some(Command::Move(Direction::Down)),
        KeyCode::Char(' ') | KeyCode::Enter => Some(Command::Respawn),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Command::Restart),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::PageDown => Some(Command::NextLevel),
        KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::PageUp => Some(Command::PreviousLevel),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(Command::Quit),
        _ => None,
    }
}

fn direction_of(code: KeyCode) -> Option<Direction> {
    match command_for(code) {
        Some(Command::Move(dir)) => Some(dir),
        _ => None,
    }
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the last drain.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,

    /// When the held direction last produced a step.
    last_step: Option<Instant>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
            last_step: None,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Direction to walk this frame: immediately on a fresh press, then
    /// once per `repeat` while the key stays held.
    pub fn step_direction(&mut self, repeat: Duration) -> Option<Direction> {
        self.step_direction_at(repeat, Instant::now())
    }

    fn step_direction_at(&mut self, repeat: Duration, now: Instant) -> Option<Direction> {
        if let Some(dir) = self.fresh_presses.iter().find_map(|&c| direction_of(c)) {
            self.last_step = Some(now);
            return Some(dir);
        }

        let held = self.last_active.keys()
            .filter(|&&c| self.is_held_at(c, now))
            .find_map(|&c| direction_of(c))?;
        let due = self.last_step.map_or(true, |t| now.duration_since(t) >= repeat);
        if due {
            self.last_step = Some(now);
            Some(held)
        } else {
            None
        }
    }

    /// One-shot commands pressed this frame, movement excluded.
    pub fn commands(&self) -> Vec<Command> {
        self.fresh_presses.iter()
            .filter_map(|&c| command_for(c))
            .filter(|c| !matches!(c, Command::Move(_)))
            .collect()
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code)
            .map(|t| now.duration_since(*t) < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn bindings_cover_arrows_wasd_and_vi_keys() {
        for code in [KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('h')] {
            assert_eq!(command_for(code), Some(Command::Move(Direction::Left)));
        }
        assert_eq!(command_for(KeyCode::Char('j')), Some(Command::Move(Direction::Down)));
        assert_eq!(command_for(KeyCode::Char('r')), Some(Command::Restart));
        assert_eq!(command_for(KeyCode::Esc), Some(Command::Quit));
        assert_eq!(command_for(KeyCode::Char('z')), None);
    }

    #[test]
    fn fresh_press_steps_immediately() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.record(press(KeyCode::Right), now);
        assert_eq!(input.step_direction_at(Duration::from_millis(150), now), Some(Direction::Right));
    }

    #[test]
    fn held_key_repeats_after_interval() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        let repeat = Duration::from_millis(150);
        input.record(press(KeyCode::Up), t0);
        assert_eq!(input.step_direction_at(repeat, t0), Some(Direction::Up));

        // Terminal auto-repeat keeps the key alive without a fresh press.
        input.fresh_presses.clear();
        let t1 = t0 + Duration::from_millis(100);
        input.record(press(KeyCode::Up), t1);
        assert_eq!(input.step_direction_at(repeat, t1), None);

        input.fresh_presses.clear();
        let t2 = t0 + Duration::from_millis(155);
        input.record(press(KeyCode::Up), t2);
        assert_eq!(input.step_direction_at(repeat, t2), Some(Direction::Up));
    }

    #[test]
    fn commands_exclude_movement() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.record(press(KeyCode::Left), now);
        input.record(press(KeyCode::Char('n')), now);
        assert_eq!(input.commands(), vec![Command::NextLevel]);
    }
}
