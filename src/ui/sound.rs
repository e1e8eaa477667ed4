/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;

/// One sound effect per kind of thing the player can notice.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Step,
    Slide,
    Bump,
    Crack,
    Collapse,
    Press,
    Unlock,
    Splash,
    Fall,
    Clear,
}

impl Sfx {
    pub const COUNT: usize = 10;

    /// Sound for an event, if it has one.
    pub fn for_event(event: &GameEvent) -> Option<Sfx> {
        match event {
            GameEvent::PlayerMoved { .. } => Some(Sfx::Step),
            GameEvent::PlayerSlid { .. } => Some(Sfx::Slide),
            GameEvent::MoveBlocked => Some(Sfx::Bump),
            GameEvent::FloorCracking { .. } => Some(Sfx::Crack),
            GameEvent::FloorCollapsed { .. } => Some(Sfx::Collapse),
            GameEvent::ButtonPressed { .. } => Some(Sfx::Press),
            GameEvent::DoorUnlocked { .. } => Some(Sfx::Unlock),
            GameEvent::PlayerDrowned => Some(Sfx::Splash),
            GameEvent::PlayerFell => Some(Sfx::Fall),
            GameEvent::LevelCompleted { .. } => Some(Sfx::Clear),
            GameEvent::LevelRestarted => None,
        }
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::warn;

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    /// Pre-generated WAV buffers, indexed by `Sfx`.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: [Arc<Vec<u8>>; Sfx::COUNT],
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "no audio output, sound disabled");
                    return None;
                }
            };

            let buffers = [
                gen_step(),
                gen_slide(),
                gen_bump(),
                gen_crack(),
                gen_collapse(),
                gen_press(),
                gen_unlock(),
                gen_splash(),
                gen_fall(),
                gen_clear(),
            ]
            .map(|samples| Arc::new(make_wav(&samples)));

            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let buf = &self.buffers[sfx as usize];
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn len_of(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Simple sine blip at given frequency and duration
    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = len_of(duration);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32); // linear fade out
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Pitch sweep from `f0` to `f1`, optional noise mix.
    fn gen_sweep(f0: f32, f1: f32, duration: f32, noise: f32, volume: f32) -> Vec<f32> {
        let n = len_of(duration);
        let mut rng: u32 = 12345;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = f0 + (f1 - f0) * t;
                phase += freq / SAMPLE_RATE as f32;
                let tone = (phase * TAU).sin();
                // Simple LCG noise
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let hiss = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(0.7);
                (tone * (1.0 - noise) + hiss * noise) * env * volume
            })
            .collect()
    }

    /// Sequence of notes, each with a short decay.
    fn gen_notes(notes: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = len_of(note_dur);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.4;
                // Square-ish wave (sine + 3rd harmonic) for retro feel
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    fn gen_step() -> Vec<f32> { gen_blip(520.0, 0.025, 0.12) }

    /// Slide: rising hiss across the ice
    fn gen_slide() -> Vec<f32> { gen_sweep(900.0, 1500.0, 0.18, 0.5, 0.15) }

    fn gen_bump() -> Vec<f32> { gen_blip(110.0, 0.05, 0.25) }

    /// Crack: short noisy tick
    fn gen_crack() -> Vec<f32> { gen_sweep(400.0, 250.0, 0.06, 0.8, 0.25) }

    /// Collapse: low rumble falling away
    fn gen_collapse() -> Vec<f32> { gen_sweep(180.0, 60.0, 0.3, 0.7, 0.3) }

    fn gen_press() -> Vec<f32> { gen_notes(&[330.0, 262.0], 0.05, 0.25) }

    /// Door: ascending two-note chime
    fn gen_unlock() -> Vec<f32> { gen_notes(&[784.0, 1047.0], 0.08, 0.25) }

    /// Splash: bright noise burst
    fn gen_splash() -> Vec<f32> { gen_sweep(1200.0, 300.0, 0.25, 0.85, 0.3) }

    /// Fall: descending whistle
    fn gen_fall() -> Vec<f32> { gen_sweep(700.0, 150.0, 0.35, 0.0, 0.25) }

    /// Level clear: C5→E5→G5→C6 fanfare with a held last note
    fn gen_clear() -> Vec<f32> {
        let mut samples = gen_notes(&[523.0, 659.0, 784.0], 0.1, 0.3);
        samples.extend(gen_blip(1047.0, 0.3, 0.3));
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API — compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Position;

    #[test]
    fn hazards_have_distinct_sounds() {
        assert_eq!(Sfx::for_event(&GameEvent::PlayerDrowned), Some(Sfx::Splash));
        assert_eq!(Sfx::for_event(&GameEvent::PlayerFell), Some(Sfx::Fall));
        assert_eq!(Sfx::for_event(&GameEvent::FloorCollapsed { pos: Position::new(0, 0) }), Some(Sfx::Collapse));
    }

    #[test]
    fn restart_is_silent() {
        assert_eq!(Sfx::for_event(&GameEvent::LevelRestarted), None);
        assert_eq!(Sfx::for_event(&GameEvent::DoorUnlocked { pos: Position::new(3, 1) }), Some(Sfx::Unlock));
    }
}
