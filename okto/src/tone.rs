use std::time::Duration;

use rodio::Source;

/// An endless sine tone for the CHIP-8 beep.
///
/// Always one channel at 48kHz; play/pause of the surrounding sink follows
/// the machine's sound timer.
#[derive(Clone, Debug)]
pub struct BeepTone {
    frequency: f32,
    current_sample: usize,
}

impl BeepTone {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            current_sample: 0,
        }
    }
}

impl Iterator for BeepTone {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let time = self.current_sample as f32 / self.sample_rate() as f32;
        self.current_sample = self.current_sample.wrapping_add(1);

        Some((2.0 * std::f32::consts::PI * self.frequency * time).sin())
    }
}

impl Source for BeepTone {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        48_000
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
