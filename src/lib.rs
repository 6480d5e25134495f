pub mod engine_slot;
pub mod options;
pub mod params;
mod plugin;
pub mod regulator;
pub mod shifter;
pub mod stretch;

use nih_plug::prelude::*;
use plugin::LivePitchShifter;

impl ClapPlugin for LivePitchShifter {
    const CLAP_ID: &'static str = "com.your-domain.live-pitch-shifter";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Live stereo pitch shifter on a streaming stretch engine");
    const CLAP_MANUAL_URL: Option<&'static str> = Some(Self::URL);
    const CLAP_SUPPORT_URL: Option<&'static str> = None;

    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::PitchShifter,
    ];
}

nih_export_clap!(LivePitchShifter);

impl Vst3Plugin for LivePitchShifter {
    const VST3_CLASS_ID: [u8; 16] = *b"LivePitchShift!!";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::PitchShift];
}

nih_export_vst3!(LivePitchShifter);
