use std::collections::VecDeque;

use signalsmith_stretch::Stretch;

use crate::stretch::{EngineConfig, EngineFlags, StretchEngine, CHANNELS};

/// Frequencies below this stay tonally stable when formant preservation is
/// requested; passed to the stretcher as a fraction of the sample rate.
const TONALITY_LIMIT_HZ: f32 = 8000.0;

/// Streaming adapter over the Signalsmith stretch library.
///
/// The library itself is push-through: every `process` call maps an input
/// slice onto an output slice whose relative lengths encode the stretch
/// ratio. This wrapper turns that into the push/pull contract of
/// [`StretchEngine`] by keeping produced frames in an interleaved FIFO until
/// the caller retrieves them.
///
/// Of the configuration flags, this engine acts on the quality tier
/// (`ENGINE_FINER` selects the full-quality preset, anything else the
/// cheaper one) and `FORMANT_PRESERVED`; the remaining flags describe
/// distinctions this library does not expose and are accepted unchanged.
pub struct SignalsmithStretcher {
    stretch: Stretch,
    time_ratio: f32,
    tonality_limit: Option<f32>,
    start_delay: usize,
    input_scratch: Vec<f32>,
    output_scratch: Vec<f32>,
    pending: VecDeque<f32>,
}

impl StretchEngine for SignalsmithStretcher {
    fn create(config: &EngineConfig) -> Self {
        let channels = config.channels as u32;
        let sample_rate = config.sample_rate.round() as u32;

        let stretch = if config.flags.contains(EngineFlags::ENGINE_FINER) {
            Stretch::preset_default(channels, sample_rate)
        } else {
            Stretch::preset_cheaper(channels, sample_rate)
        };

        let tonality_limit = if config.flags.contains(EngineFlags::FORMANT_PRESERVED) {
            Some(TONALITY_LIMIT_HZ / config.sample_rate)
        } else {
            None
        };

        let start_delay = stretch.input_latency() + stretch.output_latency();

        Self {
            stretch,
            time_ratio: 1.0,
            tonality_limit,
            start_delay,
            input_scratch: Vec::new(),
            output_scratch: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn set_pitch_scale(&mut self, ratio: f32) {
        if ratio.is_finite() && ratio > 0.0 {
            let semitones = 12.0 * ratio.log2();
            self.stretch
                .set_transpose_factor_semitones(semitones, self.tonality_limit);
        }
    }

    fn set_time_ratio(&mut self, ratio: f32) {
        if ratio.is_finite() && ratio >= 0.0 {
            self.time_ratio = ratio;
        }
    }

    fn process(&mut self, input: [&[f32]; CHANNELS], final_block: bool) {
        let frames = input[0].len();
        if frames == 0 {
            return;
        }

        // The library expresses the stretch ratio through the slice lengths:
        // `frames` input frames become `frames * time_ratio` output frames.
        let out_frames = (frames as f32 * self.time_ratio).round() as usize;
        if out_frames == 0 {
            // A ratio this small only happens with a pathological backlog;
            // dropping the block drains faster than stretching it would.
            return;
        }

        self.input_scratch.clear();
        for frame in 0..frames {
            for channel in &input {
                self.input_scratch.push(channel[frame]);
            }
        }

        self.output_scratch.resize(out_frames * CHANNELS, 0.0);
        self.output_scratch.fill(0.0);

        if final_block {
            self.stretch.flush(&mut self.output_scratch[..]);
        } else {
            self.stretch
                .process(&self.input_scratch[..], &mut self.output_scratch[..]);
        }

        self.pending.extend(self.output_scratch.iter().copied());
    }

    fn available(&self) -> usize {
        self.pending.len() / CHANNELS
    }

    fn retrieve(&mut self, output: [&mut [f32]; CHANNELS]) -> usize {
        let frames = output[0].len().min(self.available());
        let [left, right] = output;
        for frame in 0..frames {
            // Frames are queued interleaved, one sample per channel.
            left[frame] = self.pending.pop_front().unwrap_or(0.0);
            right[frame] = self.pending.pop_front().unwrap_or(0.0);
        }
        frames
    }

    fn start_delay(&self) -> usize {
        self.start_delay
    }

    fn reset(&mut self) {
        self.stretch.reset();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(flags: EngineFlags) -> SignalsmithStretcher {
        SignalsmithStretcher::create(&EngineConfig {
            sample_rate: 48000.0,
            channels: CHANNELS,
            flags,
        })
    }

    #[test]
    fn reports_nonzero_start_delay() {
        let engine = engine(EngineFlags::PROCESS_REAL_TIME);
        assert!(engine.start_delay() > 0);
    }

    #[test]
    fn unity_ratio_buffers_one_output_frame_per_input_frame() {
        let mut engine = engine(EngineFlags::PROCESS_REAL_TIME);
        assert_eq!(engine.available(), 0);

        let block = vec![0.0f32; 512];
        engine.process([&block, &block], false);
        assert_eq!(engine.available(), 512);

        engine.process([&block, &block], false);
        assert_eq!(engine.available(), 1024);
    }

    #[test]
    fn reduced_ratio_buffers_fewer_frames() {
        let mut engine = engine(EngineFlags::PROCESS_REAL_TIME);
        engine.set_time_ratio(0.5);

        let block = vec![0.0f32; 100];
        engine.process([&block, &block], false);
        assert_eq!(engine.available(), 50);
    }

    #[test]
    fn retrieve_is_bounded_by_buffered_output() {
        let mut engine = engine(EngineFlags::PROCESS_REAL_TIME);
        let block = vec![0.0f32; 256];
        engine.process([&block, &block], false);

        let mut left = vec![1.0f32; 64];
        let mut right = vec![1.0f32; 64];
        let written = engine.retrieve([&mut left, &mut right]);
        assert_eq!(written, 64);
        assert_eq!(engine.available(), 192);

        // Ask for more than is buffered; only the rest comes back.
        let mut left = vec![1.0f32; 512];
        let mut right = vec![1.0f32; 512];
        let written = engine.retrieve([&mut left, &mut right]);
        assert_eq!(written, 192);
        assert_eq!(engine.available(), 0);
    }

    #[test]
    fn finer_and_formant_flags_are_accepted() {
        let mut engine = engine(
            EngineFlags::PROCESS_REAL_TIME
                | EngineFlags::ENGINE_FINER
                | EngineFlags::FORMANT_PRESERVED,
        );
        engine.set_pitch_scale(2.0);
        let block = vec![0.0f32; 128];
        engine.process([&block, &block], false);
        assert_eq!(engine.available(), 128);
    }

    #[test]
    fn reset_discards_buffered_output() {
        let mut engine = engine(EngineFlags::PROCESS_REAL_TIME);
        let block = vec![0.0f32; 256];
        engine.process([&block, &block], false);
        assert!(engine.available() > 0);

        engine.reset();
        assert_eq!(engine.available(), 0);
    }
}
