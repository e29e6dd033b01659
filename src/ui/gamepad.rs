/// Gamepad input using gilrs (feature `gamepad`).
///
/// D-pad and left stick walk; buttons map to menu-style actions through
/// `[gamepad]` in config.toml:
///   confirm  (A / Start)  →  respawn when dead, else nothing
///   cancel   (Select)     →  quit
///   restart  (Y)          →  reload the level
///   respawn  (X)          →  back to the start position
///
/// Without the feature every query answers "not pressed".

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::grid::Direction;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST"  => Some(Btn::B),
            "X" | "WEST"  => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB"   => Some(Btn::L1),
            "R1" | "RB"   => Some(Btn::R1),
            "START"       => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South        => Some(Btn::A),
            Button::East         => Some(Btn::B),
            Button::West         => Some(Btn::X),
            Button::North        => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start        => Some(Btn::Start),
            Button::Select       => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Actions a button can be bound to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PadAction {
    Confirm,
    Cancel,
    Restart,
    Respawn,
}

fn parse_buttons(names: &[String]) -> Vec<Btn> {
    names.iter().filter_map(|s| Btn::from_name(s)).collect()
}

struct Bindings {
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
    restart: Vec<Btn>,
    respawn: Vec<Btn>,
}

impl Bindings {
    fn from_config(cfg: &GamepadConfig) -> Self {
        // An entry with no recognised button keeps its default.
        let pick = |names: &[String], default: Vec<Btn>| {
            let parsed = parse_buttons(names);
            if parsed.is_empty() { default } else { parsed }
        };
        Bindings {
            confirm: pick(&cfg.confirm, vec![Btn::A, Btn::Start]),
            cancel:  pick(&cfg.cancel, vec![Btn::Select]),
            restart: pick(&cfg.restart, vec![Btn::Y]),
            respawn: pick(&cfg.respawn, vec![Btn::X]),
        }
    }

    fn buttons(&self, action: PadAction) -> &[Btn] {
        match action {
            PadAction::Confirm => &self.confirm,
            PadAction::Cancel  => &self.cancel,
            PadAction::Restart => &self.restart,
            PadAction::Respawn => &self.respawn,
        }
    }
}

/// Held flag plus a press edge for this frame.
#[derive(Clone, Copy, Debug, Default)]
struct Edge {
    held: bool,
    fresh: bool,
}

impl Edge {
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn set(&mut self, held: bool) {
        if held && !self.held {
            self.fresh = true;
        }
        self.held = held;
    }
}

fn dir_index(dir: Direction) -> usize {
    match dir {
        Direction::Left  => 0,
        Direction::Up    => 1,
        Direction::Right => 2,
        Direction::Down  => 3,
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [Edge; BTN_COUNT],
    dpad: [Edge; 4],
    stick: [Edge; 4],
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_xy: (f32, f32),

    bindings: Bindings,
    pub connected: bool,
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                tracing::warn!("Gamepad support unavailable: {}", e);
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs,
            buttons: [Edge::default(); BTN_COUNT],
            dpad: [Edge::default(); 4],
            stick: [Edge::default(); 4],
            stick_xy: (0.0, 0.0),
            bindings: Bindings::from_config(cfg),
            connected,
        }
    }

    /// Poll pending events. Call once per frame.
    pub fn update(&mut self) {
        for e in self.buttons.iter_mut().chain(self.dpad.iter_mut()).chain(self.stick.iter_mut()) {
            e.fresh = false;
        }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let Some(gilrs) = &mut self.gilrs else { return };
        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => self.set_button(btn, true),
                EventType::ButtonReleased(btn, _) => self.set_button(btn, false),
                EventType::AxisChanged(Axis::LeftStickX, v, _) => self.stick_xy.0 = v,
                EventType::AxisChanged(Axis::LeftStickY, v, _) => self.stick_xy.1 = v,
                EventType::Connected => {
                    tracing::info!("Gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    tracing::info!("Gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        let (x, y) = self.stick_xy;
        self.stick[dir_index(Direction::Left)].set(x < -STICK_DEADZONE);
        self.stick[dir_index(Direction::Right)].set(x > STICK_DEADZONE);
        // Stick Y grows upward; map Y grows downward.
        self.stick[dir_index(Direction::Up)].set(y > STICK_DEADZONE);
        self.stick[dir_index(Direction::Down)].set(y < -STICK_DEADZONE);
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, btn: Button, held: bool) {
        self.connected = true;
        let dpad = match btn {
            Button::DPadLeft  => Some(Direction::Left),
            Button::DPadUp    => Some(Direction::Up),
            Button::DPadRight => Some(Direction::Right),
            Button::DPadDown  => Some(Direction::Down),
            _ => None,
        };
        if let Some(dir) = dpad {
            self.dpad[dir_index(dir)].set(held);
        } else if let Some(b) = Btn::from_gilrs(btn) {
            self.buttons[b as usize].set(held);
        }
    }

    #[cfg(feature = "gamepad")]
    fn release_all(&mut self) {
        self.buttons = [Edge::default(); BTN_COUNT];
        self.dpad = [Edge::default(); 4];
        self.stick = [Edge::default(); 4];
        self.stick_xy = (0.0, 0.0);
    }

    // ── Queries ──

    pub fn pressed(&self, action: PadAction) -> bool {
        self.bindings.buttons(action).iter().any(|&b| self.buttons[b as usize].fresh)
    }

    /// Direction held on the D-pad or stick, first match in `Direction::ALL` order.
    pub fn held_direction(&self) -> Option<Direction> {
        Direction::ALL.into_iter().find(|&d| {
            let i = dir_index(d);
            self.dpad[i].held || self.stick[i].held
        })
    }

    /// Direction newly pressed this frame.
    pub fn fresh_direction(&self) -> Option<Direction> {
        Direction::ALL.into_iter().find(|&d| {
            let i = dir_index(d);
            self.dpad[i].fresh || self.stick[i].fresh
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(restart: &[&str]) -> GamepadConfig {
        GamepadConfig {
            confirm: vec!["Start".into()],
            cancel: vec!["back".into()],
            restart: restart.iter().map(|s| s.to_string()).collect(),
            respawn: vec![],
        }
    }

    #[test]
    fn button_names_are_case_insensitive_with_aliases() {
        assert_eq!(Btn::from_name("south"), Some(Btn::A));
        assert_eq!(Btn::from_name("Back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("LB"), Some(Btn::L1));
        assert_eq!(Btn::from_name("Turbo"), None);
    }

    #[test]
    fn unrecognised_bindings_keep_defaults() {
        let b = Bindings::from_config(&cfg(&["Turbo"]));
        assert_eq!(b.restart, vec![Btn::Y]);
        assert_eq!(b.respawn, vec![Btn::X]);
        assert_eq!(b.cancel, vec![Btn::Select]);
    }

    #[test]
    fn fresh_press_is_edge_triggered() {
        let mut e = Edge::default();
        e.set(true);
        assert!(e.fresh && e.held);
        e.fresh = false;
        e.set(true);
        assert!(!e.fresh);
    }

    #[test]
    fn idle_pad_reports_nothing() {
        let pad = GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: None,
            buttons: [Edge::default(); BTN_COUNT],
            dpad: [Edge::default(); 4],
            stick: [Edge::default(); 4],
            stick_xy: (0.0, 0.0),
            bindings: Bindings::from_config(&cfg(&["Y"])),
            connected: false,
        };
        assert!(!pad.pressed(PadAction::Restart));
        assert_eq!(pad.held_direction(), None);
    }
}
