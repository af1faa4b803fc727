/// Synth voice - a sine tone with a short attack/release ramp
///
/// One voice per scheduled loop. Notes are scheduled at absolute sample
/// times, so a tick landing mid-block starts sounding exactly on its sample
/// rather than at the block edge.

const ATTACK_SECS: f32 = 0.002;
const RELEASE_SECS: f32 = 0.01;
const VOICE_GAIN: f32 = 0.2;

struct ActiveNote {
    freq: f32,
    start: u64,
    end: u64,
    phase: f32,
}

pub struct Voice {
    sample_rate: f32,
    note: Option<ActiveNote>,
}

impl Voice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            note: None,
        }
    }

    /// Schedule `freq` for `duration` samples starting at absolute sample
    /// time `at`. Retriggering replaces any note still sounding.
    pub fn trigger(&mut self, freq: f32, duration: u64, at: u64) {
        self.note = Some(ActiveNote {
            freq,
            start: at,
            end: at + duration,
            phase: 0.0,
        });
    }

    pub fn is_sounding(&self) -> bool {
        self.note.is_some()
    }

    /// Mix this voice into `out`, whose first sample is absolute time `from`.
    pub fn render(&mut self, from: u64, out: &mut [f32]) {
        let sample_rate = self.sample_rate;
        let attack = (sample_rate * ATTACK_SECS) as u64;
        let release = (sample_rate * RELEASE_SECS) as u64;
        let block_end = from + out.len() as u64;

        let finished = match self.note.as_mut() {
            None => return,
            Some(note) => {
                for (i, sample) in out.iter_mut().enumerate() {
                    let t = from + i as u64;
                    if t < note.start || t >= note.end {
                        continue;
                    }

                    let elapsed = t - note.start;
                    let remaining = note.end - t;
                    let mut env = 1.0;
                    if attack > 0 && elapsed < attack {
                        env *= elapsed as f32 / attack as f32;
                    }
                    if release > 0 && remaining < release {
                        env *= remaining as f32 / release as f32;
                    }

                    *sample += (note.phase * 2.0 * std::f32::consts::PI).sin() * env * VOICE_GAIN;
                    note.phase += note.freq / sample_rate;
                    if note.phase >= 1.0 {
                        note.phase -= 1.0;
                    }
                }
                note.end <= block_end
            }
        };

        if finished {
            self.note = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_until_triggered() {
        let mut voice = Voice::new(48000.0);
        let mut block = [0.5f32; 256];
        voice.render(0, &mut block);
        assert!(block.iter().all(|s| *s == 0.5));
        assert!(!voice.is_sounding());
    }

    #[test]
    fn test_note_starts_on_its_sample_not_the_block_edge() {
        let mut voice = Voice::new(48000.0);
        voice.trigger(440.0, 1000, 50);

        let mut block = [0.0f32; 512];
        voice.render(0, &mut block);

        assert!(block[..50].iter().all(|s| *s == 0.0));
        // Past the attack ramp the tone is audible.
        assert!(block[200..400].iter().any(|s| s.abs() > 0.01));
        assert!(voice.is_sounding());
    }

    #[test]
    fn test_note_ends_after_its_duration() {
        let mut voice = Voice::new(48000.0);
        voice.trigger(440.0, 100, 0);

        let mut block = [0.0f32; 256];
        voice.render(0, &mut block);
        assert!(!voice.is_sounding());
        assert!(block[100..].iter().all(|s| *s == 0.0));

        block.fill(0.0);
        voice.render(256, &mut block);
        assert!(block.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_future_note_survives_an_earlier_block() {
        let mut voice = Voice::new(48000.0);
        voice.trigger(440.0, 100, 1000);

        let mut block = [0.0f32; 256];
        voice.render(0, &mut block);
        assert!(block.iter().all(|s| *s == 0.0));
        assert!(voice.is_sounding());
    }
}
