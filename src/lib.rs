/// STEPBOX - A 16-step drum machine library
///
/// This library provides the pieces of a minimal step sequencer:
/// - A fixed 16-step pattern with per-step toggling
/// - A sample-accurate loop scheduler driven by the audio callback
/// - A simple synth voice for the drum tone
/// - Audio output via cpal

pub mod sequencer;
pub mod audio;

// Re-export commonly used types
pub use sequencer::{StepPattern, StepSequencer, StepIndexError, STEP_COUNT};
pub use sequencer::engine::Engine;
pub use audio::{AudioError, AudioOutput, Voice};
