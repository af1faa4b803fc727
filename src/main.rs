#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use stepbox::{AudioOutput, StepSequencer, STEP_COUNT};

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let sequencer = StepSequencer::new();
    let audio = match AudioOutput::start(|sample_rate| sequencer.build_engine(sample_rate)) {
        Ok(audio) => audio,
        Err(err) => {
            log::error!("failed to start audio output: {err}");
            eprintln!("stepbox: failed to start audio output: {err}");
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([760.0, 220.0])
            .with_title("STEPBOX - Drum Machine"),
        ..Default::default()
    };

    eframe::run_native(
        "STEPBOX",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(DrumMachineApp {
                sequencer,
                _audio: audio,
            }))
        }),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct DrumMachineApp {
    sequencer: StepSequencer,
    // Keeps the cpal stream alive for the lifetime of the app.
    _audio: AudioOutput,
}

#[cfg(feature = "gui")]
impl eframe::App for DrumMachineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("STEPBOX");
            ui.add_space(10.0);

            // Transport
            ui.horizontal(|ui| {
                if self.sequencer.is_playing() {
                    if ui.button("⏸ Stop").clicked() {
                        self.sequencer.start_stop_loop();
                    }
                } else {
                    if ui.button("▶ Play").clicked() {
                        self.sequencer.start_stop_loop();
                    }
                }
            });

            ui.add_space(20.0);

            // Step grid
            ui.label("Steps:");
            ui.add_space(5.0);

            let steps = self.sequencer.steps();
            ui.horizontal(|ui| {
                for index in 0..STEP_COUNT {
                    let button = egui::Button::new(format!("{}", index + 1))
                        .min_size(egui::vec2(40.0, 60.0))
                        .fill(if steps[index] {
                            egui::Color32::from_rgb(60, 60, 200)
                        } else {
                            egui::Color32::from_rgb(40, 40, 40)
                        });

                    if ui.add(button).clicked() {
                        if let Err(err) = self.sequencer.toggle_step(index) {
                            log::warn!("{err}");
                        }
                    }
                }
            });

            ui.separator();
            ui.label("Click steps to enable/disable them");
        });
    }
}
