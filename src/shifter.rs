use nih_plug::nih_log;

use crate::engine_slot::EngineSlot;
use crate::options::{OptionError, SelectedOptions};
use crate::regulator::corrective_time_ratio;
use crate::stretch::{StretchEngine, CHANNELS};

/// Read-only snapshot of the shifter for the control path.
#[derive(Debug, Clone, PartialEq)]
pub struct ShifterStatus {
    /// Explicitly selected options, in catalog category order.
    pub options: Vec<(&'static str, &'static str)>,
    /// The engine's startup latency, absent while no engine exists.
    pub latency: Option<usize>,
    /// Buffered-output depth observed at the end of the last block.
    pub available: usize,
}

/// The stereo pitch-shifting core: one stretch engine fed block by block,
/// with a bypass path around it.
///
/// Everything here runs on the processing thread. Control changes (pitch,
/// bypass, options) mutate plain fields between blocks; an option change
/// only marks the engine stale, and the swap happens at the top of the next
/// `process_block`, never mid-stream.
pub struct StereoShifter<E: StretchEngine> {
    pitch: f32,
    bypass: bool,
    last_available: usize,
    options: SelectedOptions,
    slot: EngineSlot<E>,
    scratch: [Vec<f32>; CHANNELS],
}

impl<E: StretchEngine> StereoShifter<E> {
    pub fn new() -> Self {
        Self {
            pitch: 1.0,
            bypass: false,
            last_available: 0,
            options: SelectedOptions::new(),
            slot: EngineSlot::new(),
            scratch: [Vec::new(), Vec::new()],
        }
    }

    /// Pre-sizes the input scratch for the largest block the host will send,
    /// so the audio path never allocates.
    pub fn prepare(&mut self, max_block_size: usize) {
        for channel in &mut self.scratch {
            channel.clear();
            channel.reserve(max_block_size);
        }
    }

    /// Drops the engine and its buffered audio; the next block starts clean.
    pub fn reset(&mut self) {
        self.slot.clear();
        self.last_available = 0;
    }

    /// Pitch ratio, 1.0 = unity. Any float is accepted; keeping the value
    /// musically sane is the caller's business.
    pub fn set_pitch(&mut self, ratio: f32) {
        self.pitch = ratio;
    }

    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
    }

    /// Selects a named option value and marks the engine for recreation.
    ///
    /// An unknown value is reported as an error and changes nothing.
    pub fn set_option(&mut self, category: &str, value: &str) -> Result<(), OptionError> {
        self.options.set(category, value)?;
        self.slot.mark_stale();
        Ok(())
    }

    pub fn status(&self) -> ShifterStatus {
        ShifterStatus {
            options: self.options.iter().collect(),
            latency: self.slot.engine().map(|engine| engine.start_delay()),
            available: self.last_available,
        }
    }

    /// Dumps the current options and latency to the log (the `print`
    /// control message).
    pub fn log_status(&self) {
        nih_log!("current options:");
        for (category, value) in self.options.iter() {
            nih_log!("'{}' : '{}'", category, value);
        }
        if let Some(engine) = self.slot.engine() {
            nih_log!("latency : {}", engine.start_delay());
        }
    }

    /// Processes one fixed-size block in place, two channels.
    ///
    /// Bypassed, the buffer already holds the input, so passthrough is the
    /// identity and the engine is not touched. Otherwise the input is pushed
    /// through the engine and a block of buffered output is pulled back out;
    /// when the engine has not yet buffered a full block (startup, or an
    /// underrun after reconfiguration), the block is zero-filled instead of
    /// reading short.
    pub fn process_block(&mut self, sample_rate: f32, channels: &mut [&mut [f32]]) {
        let (left, right) = match channels {
            [left, right] => (&mut **left, &mut **right),
            _ => return,
        };
        let frames = left.len();
        if frames == 0 || self.bypass {
            return;
        }

        let flags = self.options.combined_flags();
        let engine = self.slot.ensure_ready(sample_rate, flags);

        engine.set_pitch_scale(self.pitch);
        // Backlog beyond the intrinsic delay is drained by consuming input
        // faster than real-time for a while.
        let buffered = engine.available();
        engine.set_time_ratio(corrective_time_ratio(buffered, engine.start_delay()));

        // The buffer is about to be overwritten with output; stash the input
        // first.
        self.scratch[0].clear();
        self.scratch[0].extend_from_slice(left);
        self.scratch[1].clear();
        self.scratch[1].extend_from_slice(right);

        engine.process([&self.scratch[0], &self.scratch[1]], false);

        let available = engine.available();
        if available > frames {
            engine.retrieve([left, right]);
            self.last_available = available - frames;
        } else {
            left.fill(0.0);
            right.fill(0.0);
            self.last_available = available;
        }
    }
}

impl<E: StretchEngine> Default for StereoShifter<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_slot::SlotState;
    use crate::stretch::testing::{ScriptedEngine, SCRIPTED_DELAY, SCRIPTED_FILL};

    const BLOCK: usize = 64;
    const SAMPLE_RATE: f32 = 48000.0;

    fn shifter() -> StereoShifter<ScriptedEngine> {
        let mut shifter = StereoShifter::new();
        shifter.prepare(BLOCK);
        shifter
    }

    /// Runs one block in place and returns the resulting channel contents.
    fn run_block(
        shifter: &mut StereoShifter<ScriptedEngine>,
        left: &[f32],
        right: &[f32],
    ) -> (Vec<f32>, Vec<f32>) {
        let mut left = left.to_vec();
        let mut right = right.to_vec();
        {
            let mut channels: Vec<&mut [f32]> = vec![&mut left[..], &mut right[..]];
            shifter.process_block(SAMPLE_RATE, &mut channels);
        }
        (left, right)
    }

    fn ramp(frames: usize) -> Vec<f32> {
        (0..frames).map(|i| i as f32 / frames as f32).collect()
    }

    #[test]
    fn bypass_passes_both_channels_through_untouched() {
        let mut shifter = shifter();
        shifter.set_bypass(true);

        let channel_one = ramp(BLOCK);
        let channel_two: Vec<f32> = channel_one.iter().map(|s| -s).collect();
        let (out_one, out_two) = run_block(&mut shifter, &channel_one, &channel_two);

        assert_eq!(out_one, channel_one);
        assert_eq!(out_two, channel_two);
        // The engine is never even created on the bypass path.
        assert_eq!(shifter.slot.state(), SlotState::Absent);
    }

    #[test]
    fn first_block_underruns_into_silence() {
        let mut shifter = shifter();

        let input = ramp(BLOCK);
        let (left, right) = run_block(&mut shifter, &input, &input);

        // One block in, one block buffered: not strictly more than a block,
        // so the output is silence rather than a short read.
        assert_eq!(left, vec![0.0; BLOCK]);
        assert_eq!(right, vec![0.0; BLOCK]);
        assert_eq!(shifter.status().available, BLOCK);
    }

    #[test]
    fn output_is_pulled_once_enough_is_buffered() {
        let mut shifter = shifter();
        let input = ramp(BLOCK);

        run_block(&mut shifter, &input, &input);
        let (left, right) = run_block(&mut shifter, &input, &input);

        assert_eq!(left, vec![SCRIPTED_FILL; BLOCK]);
        assert_eq!(right, vec![SCRIPTED_FILL; BLOCK]);
        // Two blocks in, one block out.
        assert_eq!(shifter.status().available, BLOCK);
    }

    #[test]
    fn engine_is_created_lazily_on_the_first_processed_block() {
        let mut shifter = shifter();
        assert_eq!(shifter.slot.state(), SlotState::Absent);

        let input = vec![0.0; BLOCK];
        run_block(&mut shifter, &input, &input);
        assert_eq!(shifter.slot.state(), SlotState::Active);
    }

    #[test]
    fn pitch_is_applied_to_the_engine_every_block() {
        let mut shifter = shifter();
        shifter.set_pitch(1.5);

        let input = vec![0.0; BLOCK];
        run_block(&mut shifter, &input, &input);
        let engine = shifter.slot.engine().unwrap();
        assert_eq!(engine.pitch_scale, 1.5);
    }

    #[test]
    fn backlog_beyond_the_delay_lowers_the_time_ratio() {
        let mut shifter = shifter();
        let input = vec![0.0; BLOCK];
        run_block(&mut shifter, &input, &input);

        let backlog = SCRIPTED_DELAY + 10_000;
        shifter.slot.engine_mut().unwrap().buffered = backlog;
        run_block(&mut shifter, &input, &input);

        let engine = shifter.slot.engine().unwrap();
        assert!((engine.time_ratio - 0.5).abs() < 1e-3);
    }

    #[test]
    fn no_backlog_keeps_the_time_ratio_at_unity() {
        let mut shifter = shifter();
        let input = vec![0.0; BLOCK];
        run_block(&mut shifter, &input, &input);
        run_block(&mut shifter, &input, &input);

        let engine = shifter.slot.engine().unwrap();
        assert_eq!(engine.time_ratio, 1.0);
    }

    #[test]
    fn accepted_option_marks_the_engine_stale_and_rebuilds_it() {
        let mut shifter = shifter();
        let input = vec![0.0; BLOCK];
        run_block(&mut shifter, &input, &input);

        shifter.set_option("smoothing", "on").unwrap();
        assert_eq!(shifter.slot.state(), SlotState::Stale);

        run_block(&mut shifter, &input, &input);
        assert_eq!(shifter.slot.state(), SlotState::Active);
        let engine = shifter.slot.engine().unwrap();
        assert!(engine
            .config
            .flags
            .contains(crate::stretch::EngineFlags::SMOOTHING_ON));
        // The replacement started from scratch.
        assert_eq!(engine.frames_in, BLOCK);
    }

    #[test]
    fn rejected_option_reports_an_error_and_changes_nothing() {
        let mut shifter = shifter();
        shifter.set_option("engine", "finer").unwrap();
        let before = shifter.status();

        let err = shifter.set_option("engine", "bogus").unwrap_err();
        assert_eq!(err.to_string(), "bad value 'bogus' for option 'engine'");
        assert_eq!(shifter.status(), before);
        assert_eq!(
            shifter.status().options,
            vec![("engine", "finer")]
        );
    }

    #[test]
    fn status_reflects_engine_presence() {
        let mut shifter = shifter();
        let status = shifter.status();
        assert!(status.options.is_empty());
        assert_eq!(status.latency, None);
        assert_eq!(status.available, 0);

        let input = vec![0.0; BLOCK];
        run_block(&mut shifter, &input, &input);
        let status = shifter.status();
        assert_eq!(status.latency, Some(SCRIPTED_DELAY));

        // The log dump walks the same data; it just has to not panic.
        shifter.log_status();
    }

    #[test]
    fn reset_drops_the_engine() {
        let mut shifter = shifter();
        let input = vec![0.0; BLOCK];
        run_block(&mut shifter, &input, &input);
        assert_eq!(shifter.slot.state(), SlotState::Active);

        shifter.reset();
        assert_eq!(shifter.slot.state(), SlotState::Absent);
        assert_eq!(shifter.status().available, 0);
    }

    #[test]
    fn ten_blocks_of_silence_stay_silent_and_bounded() {
        let mut shifter = shifter();
        let input = vec![0.0; BLOCK];

        // The scripted engine's fill value stands in for real output; make
        // it silence so the whole pipeline should stay at zero.
        run_block(&mut shifter, &input, &input);
        shifter.slot.engine_mut().unwrap().fill_value = 0.0;

        for _ in 1..10 {
            let (left, right) = run_block(&mut shifter, &input, &input);
            assert_eq!(left, vec![0.0; BLOCK]);
            assert_eq!(right, vec![0.0; BLOCK]);
            // The backlog settles at one block and stops growing.
            assert_eq!(shifter.status().available, BLOCK);
        }
    }

    #[test]
    fn empty_and_mismatched_buffers_are_ignored() {
        let mut shifter = shifter();
        let mut empty: Vec<&mut [f32]> = Vec::new();
        shifter.process_block(SAMPLE_RATE, &mut empty);

        let mut only = vec![0.0f32; BLOCK];
        let mut one: Vec<&mut [f32]> = vec![&mut only[..]];
        shifter.process_block(SAMPLE_RATE, &mut one);
        assert_eq!(shifter.slot.state(), SlotState::Absent);
    }
}
