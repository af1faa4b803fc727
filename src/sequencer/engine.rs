/// Loop scheduler - the shared clock and the per-step scheduled loops
///
/// Runs entirely inside the audio callback, so ticks land on exact sample
/// boundaries regardless of UI thread timing. The only state shared with the
/// UI is the transport flag (and whatever the loop callbacks capture).
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audio::Voice;

/// Invoked once per quarter-note tick with the tick's absolute sample time
/// and the loop's own voice.
pub type LoopCallback = Box<dyn FnMut(u64, &mut Voice) + Send>;

/// The shared clock all loops are driven by. Tick times are absolute sample
/// counts; `None` means stopped.
struct Transport {
    samples_per_tick: u64,
    next_tick: Option<u64>,
}

impl Transport {
    fn new(samples_per_tick: u64) -> Self {
        Self {
            samples_per_tick,
            next_tick: None,
        }
    }

    fn start(&mut self, now: u64) {
        self.next_tick = Some(now);
    }

    fn stop(&mut self) {
        self.next_tick = None;
    }

    fn is_started(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Pop the next tick strictly before `end`, if one is due.
    fn next_tick_before(&mut self, end: u64) -> Option<u64> {
        match self.next_tick {
            Some(time) if time < end => {
                self.next_tick = Some(time + self.samples_per_tick);
                Some(time)
            }
            _ => None,
        }
    }
}

/// One scheduled loop: a voice, a callback, and whether the loop is started.
/// Slots are created once at engine construction and never removed.
struct LoopSlot {
    voice: Voice,
    callback: LoopCallback,
    active: bool,
}

/// Audio-side engine owning the transport and all loop slots.
///
/// The UI controls it only through the shared `running` flag; `process`
/// edge-detects that flag once per block, so starting and stopping are
/// quantized to block boundaries.
pub struct Engine {
    clock: u64,
    transport: Transport,
    loops: Vec<LoopSlot>,
    running: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(sample_rate: f32, bpm: f32, running: Arc<AtomicBool>) -> Self {
        let samples_per_tick = (sample_rate * 60.0 / bpm).round() as u64;
        Self {
            clock: 0,
            transport: Transport::new(samples_per_tick),
            loops: Vec::new(),
            running,
        }
    }

    /// Samples between quarter-note ticks at the engine's sample rate.
    pub fn samples_per_tick(&self) -> u64 {
        self.transport.samples_per_tick
    }

    pub fn add_loop<F>(&mut self, voice: Voice, callback: F)
    where
        F: FnMut(u64, &mut Voice) + Send + 'static,
    {
        self.loops.push(LoopSlot {
            voice,
            callback: Box::new(callback),
            active: false,
        });
    }

    /// Whether the voice owned by loop `index` currently has a note sounding.
    pub fn is_sounding(&self, index: usize) -> bool {
        self.loops
            .get(index)
            .map(|slot| slot.voice.is_sounding())
            .unwrap_or(false)
    }

    /// Render one mono block. Runs on the audio thread: no locks, no
    /// allocation. Stopping only deregisters future ticks; a note already
    /// sounding rings out past the stop.
    pub fn process(&mut self, out: &mut [f32]) {
        let run = self.running.load(Ordering::Relaxed);
        if run != self.transport.is_started() {
            if run {
                self.transport.start(self.clock);
                for slot in &mut self.loops {
                    slot.active = true;
                }
            } else {
                self.transport.stop();
                for slot in &mut self.loops {
                    slot.active = false;
                }
            }
        }

        out.fill(0.0);
        let end = self.clock + out.len() as u64;

        while let Some(time) = self.transport.next_tick_before(end) {
            for slot in &mut self.loops {
                if slot.active {
                    (slot.callback)(time, &mut slot.voice);
                }
            }
        }

        for slot in &mut self.loops {
            slot.voice.render(self.clock, out);
        }

        // 16 voices can land on the same tick; keep the sum in range.
        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        self.clock = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_engine(running: Arc<AtomicBool>) -> (Engine, Arc<Mutex<Vec<u64>>>) {
        // 1 kHz / 120 BPM puts ticks every 500 samples.
        let mut engine = Engine::new(1000.0, 120.0, running);
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&ticks);
        engine.add_loop(Voice::new(1000.0), move |time, _voice| {
            record.lock().unwrap().push(time);
        });
        (engine, ticks)
    }

    #[test]
    fn test_ticks_are_sample_exact_across_blocks() {
        let running = Arc::new(AtomicBool::new(true));
        let (mut engine, ticks) = recording_engine(running);

        // Odd block size so ticks straddle block boundaries.
        let mut block = [0.0f32; 333];
        for _ in 0..4 {
            engine.process(&mut block);
        }
        assert_eq!(*ticks.lock().unwrap(), vec![0, 500, 1000]);
    }

    #[test]
    fn test_no_ticks_while_stopped() {
        let running = Arc::new(AtomicBool::new(false));
        let (mut engine, ticks) = recording_engine(Arc::clone(&running));

        let mut block = [0.0f32; 512];
        engine.process(&mut block);
        assert!(ticks.lock().unwrap().is_empty());

        // Start mid-stream: the first tick lands at the current clock.
        running.store(true, Ordering::Relaxed);
        engine.process(&mut block);
        assert_eq!(*ticks.lock().unwrap(), vec![512]);
    }

    #[test]
    fn test_stop_deregisters_future_ticks() {
        let running = Arc::new(AtomicBool::new(true));
        let (mut engine, ticks) = recording_engine(Arc::clone(&running));

        let mut block = [0.0f32; 500];
        engine.process(&mut block);
        running.store(false, Ordering::Relaxed);
        for _ in 0..4 {
            engine.process(&mut block);
        }
        assert_eq!(*ticks.lock().unwrap(), vec![0]);
    }
}
