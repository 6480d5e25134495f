use nih_plug::prelude::*;

/// One parameter per option category in the catalog.
pub const NUM_OPTION_CATEGORIES: usize = 9;

// The variant names below are exactly the catalog value names, and the first
// variant of each enum is the category's engine default (the one with no
// configuration flag). The parameter layer only issues an option change when
// a value moves away from what was last seen, so an untouched parameter
// never shows up in the reported selection.

#[derive(Debug, PartialEq, Clone, Copy, Enum)]
pub enum EngineOption {
    #[name = "faster"]
    Faster,
    #[name = "finer"]
    Finer,
}

#[derive(Debug, PartialEq, Clone, Copy, Enum)]
pub enum TransientsOption {
    #[name = "crisp"]
    Crisp,
    #[name = "mixed"]
    Mixed,
    #[name = "smooth"]
    Smooth,
}

#[derive(Debug, PartialEq, Clone, Copy, Enum)]
pub enum DetectorOption {
    #[name = "compound"]
    Compound,
    #[name = "percussive"]
    Percussive,
    #[name = "soft"]
    Soft,
}

#[derive(Debug, PartialEq, Clone, Copy, Enum)]
pub enum PhaseOption {
    #[name = "laminar"]
    Laminar,
    #[name = "independent"]
    Independent,
}

#[derive(Debug, PartialEq, Clone, Copy, Enum)]
pub enum WindowOption {
    #[name = "standard"]
    Standard,
    #[name = "short"]
    Short,
    #[name = "long"]
    Long,
}

#[derive(Debug, PartialEq, Clone, Copy, Enum)]
pub enum SmoothingOption {
    #[name = "off"]
    Off,
    #[name = "on"]
    On,
}

#[derive(Debug, PartialEq, Clone, Copy, Enum)]
pub enum FormantOption {
    #[name = "shifted"]
    Shifted,
    #[name = "preserved"]
    Preserved,
}

#[derive(Debug, PartialEq, Clone, Copy, Enum)]
pub enum PriorityOption {
    #[name = "speed"]
    Speed,
    #[name = "quality"]
    Quality,
    #[name = "consistency"]
    Consistency,
}

#[derive(Debug, PartialEq, Clone, Copy, Enum)]
pub enum ChannelOption {
    #[name = "apart"]
    Apart,
    #[name = "together"]
    Together,
}

#[derive(Params)]
pub struct LivePitchShifterParams {
    /// Frequency-shift ratio, 1.0 = no shift. Playback speed is unaffected;
    /// the time-stretch side is regulated internally.
    #[id = "pitch"]
    pub pitch: FloatParam,

    #[id = "bypass"]
    pub bypass: BoolParam,

    #[id = "engine"]
    pub engine: EnumParam<EngineOption>,

    #[id = "transients"]
    pub transients: EnumParam<TransientsOption>,

    #[id = "detector"]
    pub detector: EnumParam<DetectorOption>,

    #[id = "phase"]
    pub phase: EnumParam<PhaseOption>,

    #[id = "window"]
    pub window: EnumParam<WindowOption>,

    #[id = "smoothing"]
    pub smoothing: EnumParam<SmoothingOption>,

    #[id = "formant"]
    pub formant: EnumParam<FormantOption>,

    #[id = "priority"]
    pub priority: EnumParam<PriorityOption>,

    #[id = "channel"]
    pub channel: EnumParam<ChannelOption>,
}

impl Default for LivePitchShifterParams {
    fn default() -> Self {
        Self {
            pitch: FloatParam::new(
                "Pitch",
                1.0,
                FloatRange::Skewed {
                    min: 0.25,
                    max: 4.0,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_value_to_string(formatters::v2s_f32_rounded(3)),
            bypass: BoolParam::new("Bypass", false),
            engine: EnumParam::new("Engine", EngineOption::Faster),
            transients: EnumParam::new("Transients", TransientsOption::Crisp),
            detector: EnumParam::new("Detector", DetectorOption::Compound),
            phase: EnumParam::new("Phase", PhaseOption::Laminar),
            window: EnumParam::new("Window", WindowOption::Standard),
            smoothing: EnumParam::new("Smoothing", SmoothingOption::Off),
            formant: EnumParam::new("Formant", FormantOption::Shifted),
            priority: EnumParam::new("Priority", PriorityOption::Speed),
            channel: EnumParam::new("Channel", ChannelOption::Apart),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::catalog;

    fn assert_variants_match_catalog<T: Enum>(category: &str) {
        let catalog = catalog();
        for variant in T::variants() {
            assert!(
                catalog.is_valid(category, variant),
                "param variant '{variant}' is not a catalog value of '{category}'"
            );
        }
    }

    /// Every parameter variant name must be a valid catalog value, otherwise
    /// the parameter layer could issue an option change that gets rejected.
    #[test]
    fn every_param_variant_is_a_valid_catalog_value() {
        assert_variants_match_catalog::<EngineOption>("engine");
        assert_variants_match_catalog::<TransientsOption>("transients");
        assert_variants_match_catalog::<DetectorOption>("detector");
        assert_variants_match_catalog::<PhaseOption>("phase");
        assert_variants_match_catalog::<WindowOption>("window");
        assert_variants_match_catalog::<SmoothingOption>("smoothing");
        assert_variants_match_catalog::<FormantOption>("formant");
        assert_variants_match_catalog::<PriorityOption>("priority");
        assert_variants_match_catalog::<ChannelOption>("channel");
    }

    #[test]
    fn every_catalog_category_has_a_param() {
        assert_eq!(catalog().categories().len(), NUM_OPTION_CATEGORIES);
    }

    #[test]
    fn variant_counts_cover_the_whole_catalog() {
        let per_param = EngineOption::variants().len()
            + TransientsOption::variants().len()
            + DetectorOption::variants().len()
            + PhaseOption::variants().len()
            + WindowOption::variants().len()
            + SmoothingOption::variants().len()
            + FormantOption::variants().len()
            + PriorityOption::variants().len()
            + ChannelOption::variants().len();
        assert_eq!(per_param, catalog().list_all().count());
    }
}
