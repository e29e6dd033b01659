/// Enemy decision logic.
///
/// Two behaviours, both deliberately simple:
///
///   - **Chase** (Enemy): roll one of the four directions; take the step
///     only if the player lies further along that axis in that direction.
///     Noisy and greedy; it stalls behind obstacles.
///   - **Move script** (Tentaklon): try a 4-step patrol greedily, then
///     replay it one step per tick.
///
/// Both return the direction to try. The backend performs the actual move
/// attempt, so blocked steps and attacks go through the usual rules.

use super::grid::{Direction, Point};
use super::rng::RandomSource;

// ── Chase ──

/// Pick this tick's chase step for an enemy at `me` hunting `target`.
pub fn chase_step(rng: &mut dyn RandomSource, me: Point, target: Point) -> Option<Direction> {
    let dir = Direction::ALL[rng.below(4) as usize];
    let closer = match dir {
        Direction::Left  => target.x < me.x,
        Direction::Up    => target.y < me.y,
        Direction::Right => target.x > me.x,
        Direction::Down  => target.y > me.y,
    };
    if closer { Some(dir) } else { None }
}

// ── Move script ──

pub const SCRIPT_LEN: usize = 4;

/// Direction priority: the direction recorded and the offset tested for it.
/// The vertical checks test the opposite row of the one `Up`/`Down` walk
/// to on replay, so a patrol built against a wall can replay into it.
const CHECK_ORDER: [(Direction, Point); 4] = [
    (Direction::Right, Point { x: 1, y: 0 }),
    (Direction::Left,  Point { x: -1, y: 0 }),
    (Direction::Up,    Point { x: 0, y: 1 }),
    (Direction::Down,  Point { x: 0, y: -1 }),
];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScriptPhase {
    /// No usable script; the next activation builds one.
    Idle,
    /// Probing moves from the build position.
    Scripting,
    /// Executing `moves[cursor]`, one per activation.
    Replaying,
}

/// Cyclic patrol of a Tentaklon.
///
/// The build position is simulated: it starts at the spawn point and
/// advances along each recorded step, whether or not the actor actually
/// managed to walk it. Each rebuild continues from where the last one ended.
#[derive(Clone, Copy, Debug)]
pub struct MoveScript {
    phase: ScriptPhase,
    moves: [Option<Direction>; SCRIPT_LEN],
    cursor: usize,
    build_from: Point,
}

impl MoveScript {
    pub fn new(origin: Point) -> Self {
        MoveScript {
            phase: ScriptPhase::Idle,
            moves: [None; SCRIPT_LEN],
            cursor: 0,
            build_from: origin,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> ScriptPhase {
        self.phase
    }

    #[cfg(test)]
    pub fn moves(&self) -> &[Option<Direction>; SCRIPT_LEN] {
        &self.moves
    }

    /// Direction to attempt this activation, building a script first when
    /// none is active. `is_free` answers whether a point could be entered,
    /// without side effects.
    pub fn next_step(&mut self, mut is_free: impl FnMut(Point) -> bool) -> Option<Direction> {
        if self.phase != ScriptPhase::Replaying {
            self.build(&mut is_free);
        }

        match self.moves[self.cursor] {
            Some(dir) => {
                self.cursor += 1;
                if self.cursor == SCRIPT_LEN {
                    self.phase = ScriptPhase::Idle;
                }
                Some(dir)
            }
            None => {
                // Dead end while probing: rebuild on the next activation.
                self.phase = ScriptPhase::Idle;
                None
            }
        }
    }

    fn build(&mut self, is_free: &mut impl FnMut(Point) -> bool) {
        self.phase = ScriptPhase::Scripting;

        for slot in 0..SCRIPT_LEN {
            let mut found = None;
            for (dir, offset) in CHECK_ORDER {
                let next = Point::new(self.build_from.x + offset.x, self.build_from.y + offset.y);
                if is_free(next) {
                    found = Some(dir);
                    self.build_from = next;
                    break;
                }
            }
            self.moves[slot] = found;
        }

        self.cursor = 0;
        self.phase = ScriptPhase::Replaying;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rng::Scripted;

    // ── chase ──

    #[test]
    fn chase_steps_toward_target_on_rolled_axis() {
        // roll 2 = Right; target is to the right
        let mut rng = Scripted::new(&[2]);
        assert_eq!(chase_step(&mut rng, Point::new(1, 1), Point::new(5, 1)), Some(Direction::Right));
    }

    #[test]
    fn chase_idles_when_roll_points_away() {
        // roll 0 = Left; target is to the right
        let mut rng = Scripted::new(&[0]);
        assert_eq!(chase_step(&mut rng, Point::new(1, 1), Point::new(5, 1)), None);
    }

    #[test]
    fn chase_idles_when_aligned_on_axis() {
        // roll 1 = Up; same row
        let mut rng = Scripted::new(&[1]);
        assert_eq!(chase_step(&mut rng, Point::new(1, 1), Point::new(5, 1)), None);
    }

    // ── move script ──

    fn open_field(_: Point) -> bool { true }

    #[test]
    fn open_field_scripts_four_rights() {
        let mut script = MoveScript::new(Point::new(0, 0));
        assert_eq!(script.next_step(open_field), Some(Direction::Right));
        assert_eq!(script.moves(), &[Some(Direction::Right); SCRIPT_LEN]);
        assert_eq!(script.phase(), ScriptPhase::Replaying);
    }

    #[test]
    fn build_falls_back_in_priority_order() {
        // Corridor: only x in 0..=1 on row 0, and column 1 going down.
        let free = |p: Point| (p.y == 0 && (0..=1).contains(&p.x)) || (p.x == 1 && (0..=3).contains(&p.y));
        let mut script = MoveScript::new(Point::new(0, 0));
        script.next_step(free);
        // From (0,0): Right -> (1,0); from (1,0): Right blocked, Left -> (0,0);
        // from (0,0): Right -> (1,0); from (1,0): Left -> (0,0).
        assert_eq!(
            script.moves(),
            &[Some(Direction::Right), Some(Direction::Left), Some(Direction::Right), Some(Direction::Left)],
        );
    }

    #[test]
    fn replay_runs_one_step_per_activation_then_rebuilds() {
        let mut script = MoveScript::new(Point::new(0, 0));
        let mut builds = 0;
        let mut steps = vec![];
        for _ in 0..SCRIPT_LEN + 1 {
            if script.phase() != ScriptPhase::Replaying { builds += 1; }
            steps.push(script.next_step(open_field));
        }
        assert_eq!(builds, 2);
        assert!(steps.iter().all(|s| *s == Some(Direction::Right)));
    }

    #[test]
    fn vertical_checks_record_the_mirrored_direction() {
        // One column, five rows; only the cells below (0,0) are free.
        let column = |p: Point| p.x == 0 && (0..5).contains(&p.y);
        let mut script = MoveScript::new(Point::new(0, 0));
        assert_eq!(script.next_step(column), Some(Direction::Up));
        assert_eq!(script.moves(), &[Some(Direction::Up); SCRIPT_LEN]);

        // Build position walked down to (0,4); the next build tests (0,5)
        // first, which is off the column, then (0,3) for Down.
        for _ in 1..SCRIPT_LEN {
            script.next_step(column);
        }
        assert_eq!(script.next_step(column), Some(Direction::Down));
    }

    #[test]
    fn boxed_in_actor_goes_idle() {
        let mut script = MoveScript::new(Point::new(0, 0));
        assert_eq!(script.next_step(|_| false), None);
        assert_eq!(script.phase(), ScriptPhase::Idle);
        assert_eq!(script.moves(), &[None; SCRIPT_LEN]);
    }

    #[test]
    fn rebuild_continues_from_simulated_position() {
        // Free cells: x in 0..=5 on row 0.
        let free = |p: Point| p.y == 0 && (0..=5).contains(&p.x);
        let mut script = MoveScript::new(Point::new(0, 0));
        for _ in 0..SCRIPT_LEN {
            script.next_step(free);
        }
        // Simulated position is now (4,0); x = 5 is the east wall.
        script.next_step(free);
        assert_eq!(
            script.moves(),
            &[Some(Direction::Right), Some(Direction::Left), Some(Direction::Right), Some(Direction::Left)],
        );
    }
}
