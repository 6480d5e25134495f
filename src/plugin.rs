use nih_plug::prelude::*;
use std::sync::Arc;

use crate::params::{LivePitchShifterParams, NUM_OPTION_CATEGORIES};
use crate::shifter::StereoShifter;
use crate::stretch::signalsmith::SignalsmithStretcher;

/// Fallback until the host hands us the real rate in `initialize`.
const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

pub struct LivePitchShifter {
    // Params of the plugin
    params: Arc<LivePitchShifterParams>,

    // The pitch-shifting core, engine and all
    shifter: StereoShifter<SignalsmithStretcher>,

    // Sample rate the host negotiated at initialize time
    sample_rate: f32,

    // Last seen variant index per option parameter, in declaration order.
    // All parameters start on their default variant (index 0), so nothing
    // is synced into the core until the user actually changes one.
    option_cache: [usize; NUM_OPTION_CATEGORIES],

    // Last latency figure reported to the host
    reported_latency: u32,
}

impl Default for LivePitchShifter {
    fn default() -> Self {
        Self {
            params: Arc::new(LivePitchShifterParams::default()),
            shifter: StereoShifter::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            option_cache: [0; NUM_OPTION_CATEGORIES],
            reported_latency: 0,
        }
    }
}

impl LivePitchShifter {
    /// Pushes one option parameter into the core if its value moved since
    /// the last block. A rejected value can only mean the parameter layer
    /// and the catalog went out of sync, so it is logged and dropped.
    fn sync_option<T: Enum + PartialEq + 'static>(
        shifter: &mut StereoShifter<SignalsmithStretcher>,
        param: &EnumParam<T>,
        category: &str,
        cache: &mut usize,
    ) {
        let index = param.value().to_index();
        if *cache != index {
            *cache = index;
            if let Err(err) = shifter.set_option(category, T::variants()[index]) {
                nih_error!("{}", err);
            }
        }
    }

    /// Carries every control-path change into the core before the block is
    /// processed: pitch, bypass, and any option edits.
    fn sync_controls(&mut self) {
        self.shifter.set_pitch(self.params.pitch.value());
        self.shifter.set_bypass(self.params.bypass.value());

        let [engine, transients, detector, phase, window, smoothing, formant, priority, channel] =
            &mut self.option_cache;
        Self::sync_option(&mut self.shifter, &self.params.engine, "engine", engine);
        Self::sync_option(
            &mut self.shifter,
            &self.params.transients,
            "transients",
            transients,
        );
        Self::sync_option(
            &mut self.shifter,
            &self.params.detector,
            "detector",
            detector,
        );
        Self::sync_option(&mut self.shifter, &self.params.phase, "phase", phase);
        Self::sync_option(&mut self.shifter, &self.params.window, "window", window);
        Self::sync_option(
            &mut self.shifter,
            &self.params.smoothing,
            "smoothing",
            smoothing,
        );
        Self::sync_option(&mut self.shifter, &self.params.formant, "formant", formant);
        Self::sync_option(
            &mut self.shifter,
            &self.params.priority,
            "priority",
            priority,
        );
        Self::sync_option(&mut self.shifter, &self.params.channel, "channel", channel);
    }
}

impl Plugin for LivePitchShifter {
    const NAME: &'static str = "Live Pitch Shifter";
    const VENDOR: &'static str = "Moss Audio";
    const URL: &'static str = env!("CARGO_PKG_HOMEPAGE");
    const EMAIL: &'static str = "info@example.com";

    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: NonZeroU32::new(2),
        main_output_channels: NonZeroU32::new(2),

        aux_input_ports: &[],
        aux_output_ports: &[],

        names: PortNames::const_default(),
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const MIDI_OUTPUT: MidiConfig = MidiConfig::None;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = buffer_config.sample_rate;
        self.shifter.prepare(buffer_config.max_buffer_size as usize);
        true
    }

    fn reset(&mut self) {
        // Called from the audio thread; dropping the engine here just frees
        // it, the replacement is built lazily on the next block.
        self.shifter.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.sync_controls();

        self.shifter
            .process_block(self.sample_rate, buffer.as_slice());

        // Surface the engine's startup latency so the host can compensate.
        if let Some(latency) = self.shifter.status().latency {
            let latency = latency as u32;
            if latency != self.reported_latency {
                self.reported_latency = latency;
                context.set_latency_samples(latency);
            }
        }

        ProcessStatus::Normal
    }
}
