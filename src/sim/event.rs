/// Notifications emitted by the backend.
/// The presentation layer drains these each frame for the HUD and sound.

use crate::domain::actor::ActorId;
use crate::domain::grid::Point;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PositionChanged { actor: ActorId, position: Point },
    EnergyChanged { actor: ActorId, energy: i32 },
    LivesChanged { actor: ActorId, lives: u32 },
    /// `attacker` hit `target`; `bonus` is what the occupant handed out.
    Attacked { attacker: ActorId, target: ActorId, bonus: i32 },
    InventoryChanged { item: String, amount: u32 },
    Teleported { position: Point },
    LevelLoaded { name: String },
    PlayerDefeated,
}
