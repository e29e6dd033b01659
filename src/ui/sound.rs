/// Sound effects: short procedural chiptune cues played through rodio.
///
/// Every cue is synthesised once at start-up into an in-memory WAV buffer;
/// playback is fire-and-forget. Without the `sound` feature the engine is
/// a stub that ignores every request.

use crate::domain::actor::ActorId;
use crate::sim::event::GameEvent;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Effect {
    /// Player landed a blow.
    Hit,
    /// Player took a blow.
    Hurt,
    Pickup,
    Teleport,
    LevelStart,
    LifeLost,
    Defeat,
}

impl Effect {
    pub const ALL: [Effect; 7] = [
        Effect::Hit, Effect::Hurt, Effect::Pickup, Effect::Teleport,
        Effect::LevelStart, Effect::LifeLost, Effect::Defeat,
    ];
}

/// Which cue, if any, an event deserves from the player's point of view.
pub fn effect_for(event: &GameEvent, player: Option<ActorId>) -> Option<Effect> {
    match event {
        GameEvent::Attacked { attacker, .. } if Some(*attacker) == player => Some(Effect::Hit),
        GameEvent::Attacked { target, .. } if Some(*target) == player => Some(Effect::Hurt),
        GameEvent::InventoryChanged { .. } => Some(Effect::Pickup),
        GameEvent::Teleported { .. } => Some(Effect::Teleport),
        GameEvent::LevelLoaded { .. } => Some(Effect::LevelStart),
        GameEvent::LivesChanged { actor, .. } if Some(*actor) == player => Some(Effect::LifeLost),
        GameEvent::PlayerDefeated => Some(Effect::Defeat),
        _ => None,
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Effect;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        cues: Vec<(Effect, Arc<Vec<u8>>)>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("No audio output, sound disabled: {}", e);
                    return None;
                }
            };
            let cues = Effect::ALL.iter()
                .map(|&effect| (effect, Arc::new(make_wav(&synthesize(effect)))))
                .collect();
            Some(SoundEngine { _stream: stream, handle, cues })
        }

        pub fn play(&self, effect: Effect) {
            let Some((_, buf)) = self.cues.iter().find(|(e, _)| *e == effect) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Synthesis: mono f32 samples in [-1, 1]
    // ════════════════════════════════════════════════════════════

    fn synthesize(effect: Effect) -> Vec<f32> {
        match effect {
            Effect::Hit => noise_burst(0.06, 0.35, 7),
            Effect::Hurt => sweep(320.0, 140.0, 0.12, 0.3),
            // C6 E6 G6
            Effect::Pickup => notes(&[(1047.0, 0.045), (1319.0, 0.045), (1568.0, 0.07)], 0.25),
            Effect::Teleport => sweep(200.0, 1400.0, 0.22, 0.22),
            // C5 E5 G5
            Effect::LevelStart => notes(&[(523.0, 0.08), (659.0, 0.08), (784.0, 0.16)], 0.25),
            // A4 F#4 D4
            Effect::LifeLost => notes(&[(440.0, 0.12), (370.0, 0.12), (294.0, 0.2)], 0.3),
            // A4 F#4 Eb4 C4
            Effect::Defeat => notes(&[(440.0, 0.15), (370.0, 0.15), (311.0, 0.15), (261.0, 0.4)], 0.3),
        }
    }

    fn sample_count(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Note sequence, sine plus a third harmonic, each note decaying.
    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, duration) in seq {
            let n = sample_count(duration);
            samples.extend((0..n).map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.6);
                let wave = (t * freq * TAU).sin() * 0.75 + (t * freq * 3.0 * TAU).sin() * 0.25;
                wave * env * volume
            }));
        }
        samples
    }

    /// Linear pitch glide with a fading envelope.
    fn sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = sample_count(duration);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                phase += (from + (to - from) * p) / SAMPLE_RATE as f32;
                (phase * TAU).sin() * (1.0 - p) * volume
            })
            .collect()
    }

    /// Decaying white noise from a small LCG.
    fn noise_burst(duration: f32, volume: f32, seed: u32) -> Vec<f32> {
        let n = sample_count(duration);
        let mut state = seed;
        (0..n)
            .map(|i| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let noise = (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                noise * (1.0 - i as f32 / n as f32).powi(2) * volume
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV container: 16-bit PCM mono
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        const CHANNELS: u16 = 1;
        const BITS: u16 = 16;
        let block_align = CHANNELS * BITS / 8;
        let byte_rate = SAMPLE_RATE * u32::from(block_align);
        let data_size = samples.len() as u32 * u32::from(block_align);

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVEfmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&CHANNELS.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&BITS.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _effect: Effect) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::Point;

    #[test]
    fn events_map_to_player_perspective() {
        let me = Some(ActorId(3));
        let hit = GameEvent::Attacked { attacker: ActorId(3), target: ActorId(0), bonus: 0 };
        let hurt = GameEvent::Attacked { attacker: ActorId(0), target: ActorId(3), bonus: 1 };
        let brawl = GameEvent::Attacked { attacker: ActorId(1), target: ActorId(2), bonus: 0 };
        assert_eq!(effect_for(&hit, me), Some(Effect::Hit));
        assert_eq!(effect_for(&hurt, me), Some(Effect::Hurt));
        assert_eq!(effect_for(&brawl, me), None);
        assert_eq!(effect_for(&GameEvent::Teleported { position: Point::new(1, 1) }, me), Some(Effect::Teleport));
        assert_eq!(effect_for(&GameEvent::LivesChanged { actor: ActorId(0), lives: 0 }, me), None);
    }
}
