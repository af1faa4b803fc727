/// Core sequencer logic - step pattern state and transport control
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::audio::Voice;

pub mod engine;

use engine::Engine;

/// Number of steps in the pattern. Fixed; the grid is always one bar of 16ths.
pub const STEP_COUNT: usize = 16;

/// Fixed tempo in beats per minute. Tempo control is deliberately out of scope.
pub const BEATS_PER_MINUTE: f32 = 120.0;

/// Pitch of the drum tone (C2).
pub const NOTE_FREQ_HZ: f32 = 65.41;

#[derive(Debug, Error)]
#[error("step index {index} out of range (sequencer has {STEP_COUNT} steps)")]
pub struct StepIndexError {
    pub index: usize,
}

/// The 16 step flags, shared between the UI thread and the audio thread.
///
/// Plain atomics - the audio side only ever reads one flag per tick, the UI
/// side only ever flips one flag per click, so no lock is needed.
#[derive(Debug)]
pub struct StepPattern {
    steps: [AtomicBool; STEP_COUNT],
}

impl StepPattern {
    pub fn new() -> Self {
        Self {
            steps: std::array::from_fn(|_| AtomicBool::new(false)),
        }
    }

    pub fn get(&self, index: usize) -> bool {
        self.steps
            .get(index)
            .map(|s| s.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    pub fn set(&self, index: usize, value: bool) {
        if let Some(step) = self.steps.get(index) {
            step.store(value, Ordering::Relaxed);
        }
    }

    /// Flip one flag and return its new value.
    pub fn toggle(&self, index: usize) -> bool {
        !self.steps[index].fetch_xor(true, Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> [bool; STEP_COUNT] {
        std::array::from_fn(|i| self.get(i))
    }
}

impl Default for StepPattern {
    fn default() -> Self {
        Self::new()
    }
}

/// The sequencer controller: 16 step flags plus a single transport flag.
///
/// The controller never touches audio directly. It owns the shared handles
/// that the [`Engine`] reads from inside the audio callback; `build_engine`
/// wires one scheduled loop per step against those handles.
pub struct StepSequencer {
    pattern: Arc<StepPattern>,
    running: Arc<AtomicBool>,
}

impl StepSequencer {
    pub fn new() -> Self {
        Self {
            pattern: Arc::new(StepPattern::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flip the step at `index`. Out-of-range indices are rejected rather
    /// than ignored so a miswired UI shows up immediately.
    pub fn toggle_step(&self, index: usize) -> Result<bool, StepIndexError> {
        if index >= STEP_COUNT {
            return Err(StepIndexError { index });
        }
        Ok(self.pattern.toggle(index))
    }

    pub fn step(&self, index: usize) -> bool {
        self.pattern.get(index)
    }

    pub fn steps(&self) -> [bool; STEP_COUNT] {
        self.pattern.snapshot()
    }

    /// Flip the transport flag. The audio engine observes the flag on its
    /// next block and starts or stops all 16 loops and the shared clock, so
    /// sound begins and ends asynchronously relative to this call.
    pub fn start_stop_loop(&self) {
        self.running.fetch_xor(true, Ordering::Relaxed);
    }

    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Build the audio-side engine: one loop per step, each owning a voice
    /// and a callback that captures only the shared pattern and its index.
    ///
    /// Every loop fires once per quarter note; a set flag triggers an
    /// eighth-note tone at the tick's sample timestamp.
    pub fn build_engine(&self, sample_rate: f32) -> Engine {
        let mut engine = Engine::new(
            sample_rate,
            BEATS_PER_MINUTE,
            Arc::clone(&self.running),
        );
        let note_samples = engine.samples_per_tick() / 2;

        for index in 0..STEP_COUNT {
            let pattern = Arc::clone(&self.pattern);
            engine.add_loop(Voice::new(sample_rate), move |time, voice| {
                if pattern.get(index) {
                    voice.trigger(NOTE_FREQ_HZ, note_samples, time);
                }
            });
        }

        engine
    }
}

impl Default for StepSequencer {
    fn default() -> Self {
        Self::new()
    }
}
