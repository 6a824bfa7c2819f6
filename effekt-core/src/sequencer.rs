//! Sequencer - nicht-blockierender Skript-Interpreter
//!
//! Der Sequencer schreitet ein [`Script`] in Wall-Clock-Zeitschritten voran und
//! rendert in seinen eigenen Frame. Er blockiert nie: jeder `tick()` verarbeitet
//! nur die übergebene Zeit und kehrt sofort zurück.
//!
//! Zeit wird kontinuierlich (Sekunden als `f32`) gespeichert statt in diskreten
//! Schritten, damit Animationen unabhängig von der Tick-Granularität gleichmäßig
//! laufen.

use heapless::Vec;
use rgb::RGB8;

use crate::logic::blend;
use crate::script::{Command, Script};

/// Verhalten am Skript-Ende
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopPolicy {
    /// Letzten Frame halten, Zustand wird `Finished`
    Hold,
    /// Wieder beim ersten Kommando beginnen (höchstens einmal pro Tick)
    Restart,
}

/// Kommando-spezifischer Fortschritt
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubState {
    /// Kommando wurde noch nicht angefangen
    Start,
    /// SlowFill: `pixel` wird gerade von `from` zur Zielfarbe überblendet
    Filling { pixel: usize, from: [u8; 3] },
    /// Slide: Anzahl bisher ausgeführter Verschiebungen
    Sliding { rotations: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerState {
    Idle,
    Running {
        command_index: usize,
        elapsed_in_command: f32,
        sub_state: SubState,
    },
    Finished,
}

/// Interpreter für ein Skript mit eigenem Frame (eine Ebene)
pub struct Sequencer<const N: usize> {
    state: SequencerState,
    policy: LoopPolicy,
    frame: Vec<RGB8, N>,
}

impl<const N: usize> Sequencer<N> {
    pub fn new(policy: LoopPolicy) -> Self {
        Self {
            state: SequencerState::Idle,
            policy,
            frame: Vec::new(),
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn policy(&self) -> LoopPolicy {
        self.policy
    }

    pub fn frame(&self) -> &[RGB8] {
        &self.frame
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SequencerState::Running { .. })
    }

    pub fn is_finished(&self) -> bool {
        self.state == SequencerState::Finished
    }

    /// Beginnt beim ersten Kommando mit Zeit 0
    ///
    /// Der aktuelle Frame bleibt erhalten und dient als "vorheriger Frame".
    pub fn start(&mut self) {
        self.state = SequencerState::Running {
            command_index: 0,
            elapsed_in_command: 0.0,
            sub_state: SubState::Start,
        };
    }

    /// Hält an ohne den Frame zu verändern
    pub fn stop(&mut self) {
        self.state = SequencerState::Idle;
    }

    /// Schreitet `elapsed` Sekunden voran
    ///
    /// Gibt `true` zurück wenn sich der Frame geändert hat.
    pub fn tick(&mut self, script: &Script, elapsed: f32, length: usize) -> bool {
        let mut changed = self.resize_frame(length);

        let SequencerState::Running {
            mut command_index,
            mut elapsed_in_command,
            mut sub_state,
        } = self.state
        else {
            return changed;
        };

        let mut budget = if elapsed.is_finite() && elapsed > 0.0 {
            elapsed
        } else {
            0.0
        };
        let mut wrapped = false;

        loop {
            let Some(command) = script.commands().get(command_index) else {
                match self.policy {
                    LoopPolicy::Restart if !wrapped && !script.is_empty() => {
                        wrapped = true;
                        command_index = 0;
                        elapsed_in_command = 0.0;
                        sub_state = SubState::Start;
                        continue;
                    }
                    // Schon einmal umgebrochen: Rest im nächsten Tick
                    LoopPolicy::Restart => break,
                    LoopPolicy::Hold => {
                        self.state = SequencerState::Finished;
                        return changed;
                    }
                }
            };

            match command {
                Command::Fill { segments } => {
                    for (i, pixel) in self.frame.iter_mut().enumerate() {
                        *pixel = Command::pattern_color(segments, i);
                    }
                    changed = true;
                }
                Command::SlowFill { duration, segments } => {
                    let total = Command::segment_total(segments).min(self.frame.len());
                    let (mut pixel, mut from) = match sub_state {
                        SubState::Filling { pixel, from } => (pixel, RGB8::from(from)),
                        _ => (0, self.frame.first().copied().unwrap_or_default()),
                    };
                    let t = elapsed_in_command + budget;

                    if t >= *duration || total == 0 {
                        for i in pixel..total {
                            self.frame[i] = Command::segment_color(segments, i).unwrap_or_default();
                        }
                        changed = true;
                        budget = (t - duration).max(0.0);
                    } else {
                        let per_pixel = duration / total as f32;
                        let done = ((t / per_pixel) as usize).min(total);
                        while pixel < done {
                            self.frame[pixel] =
                                Command::segment_color(segments, pixel).unwrap_or_default();
                            pixel += 1;
                            from = self.frame.get(pixel).copied().unwrap_or_default();
                        }
                        if pixel < total {
                            let target = Command::segment_color(segments, pixel).unwrap_or_default();
                            let progress = (t - pixel as f32 * per_pixel) / per_pixel;
                            self.frame[pixel] = blend(from, target, progress);
                        }
                        changed = true;
                        elapsed_in_command = t;
                        sub_state = SubState::Filling {
                            pixel,
                            from: from.into(),
                        };
                        break;
                    }
                }
                Command::Slide { period, offset } => {
                    let t = elapsed_in_command + budget;
                    let steps = (t / period) as u64;
                    let rotations = match sub_state {
                        SubState::Sliding { rotations } => rotations,
                        _ => 0,
                    };
                    let len = self.frame.len() as u64;
                    if steps > 0 && len > 0 {
                        let per_step = (*offset as i64).rem_euclid(len as i64) as u64;
                        let shift = (per_step * (steps % len)) % len;
                        self.frame.rotate_right(shift as usize);
                        changed = true;
                    }
                    elapsed_in_command = t - steps as f32 * period;
                    sub_state = SubState::Sliding {
                        rotations: rotations.saturating_add(steps.min(u32::MAX as u64) as u32),
                    };
                    // Slide endet nie von selbst
                    break;
                }
            }

            command_index += 1;
            elapsed_in_command = 0.0;
            sub_state = SubState::Start;
        }

        self.state = SequencerState::Running {
            command_index,
            elapsed_in_command,
            sub_state,
        };
        changed
    }

    fn resize_frame(&mut self, length: usize) -> bool {
        let length = length.min(N);
        if self.frame.len() == length {
            return false;
        }
        self.frame.resize(length, RGB8::default()).ok();
        true
    }
}
