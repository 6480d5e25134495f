use crate::stretch::{EngineConfig, EngineFlags, StretchEngine, CHANNELS};

/// Lifecycle of the owned engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No instance exists yet.
    Absent,
    /// An instance exists and matches the current configuration.
    Active,
    /// An instance exists but the configuration changed since it was built;
    /// it will be replaced at the next `ensure_ready`.
    Stale,
}

/// Owns zero-or-one stretch engine instance and keeps it in sync with the
/// configuration it was built for.
///
/// Option changes never touch the instance directly; they only mark it stale
/// here. The actual destroy-and-recreate happens synchronously inside
/// `ensure_ready` at the start of the next block, so an in-flight `process`
/// call can never observe a half-configured engine.
pub struct EngineSlot<E> {
    engine: Option<E>,
    config: Option<EngineConfig>,
    stale: bool,
}

impl<E: StretchEngine> EngineSlot<E> {
    pub fn new() -> Self {
        Self {
            engine: None,
            config: None,
            stale: false,
        }
    }

    pub fn state(&self) -> SlotState {
        match (&self.engine, self.stale) {
            (None, _) => SlotState::Absent,
            (Some(_), true) => SlotState::Stale,
            (Some(_), false) => SlotState::Active,
        }
    }

    /// Flags the current instance for replacement. Called by the option
    /// layer on every accepted option change.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Drops the instance outright (host reset / teardown).
    pub fn clear(&mut self) {
        self.engine = None;
        self.config = None;
        self.stale = false;
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    #[cfg(test)]
    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    /// Returns an engine matching the latest accepted options, building one
    /// if needed. Called once per block before any other engine interaction.
    ///
    /// A stale mark, a flag change, or a sample-rate change all replace the
    /// instance. Whatever the old instance still had buffered is discarded
    /// with it; the brief transient is the documented cost of reconfiguring
    /// a live stream.
    pub fn ensure_ready(&mut self, sample_rate: f32, flags: EngineFlags) -> &mut E {
        let wanted = EngineConfig {
            sample_rate,
            channels: CHANNELS,
            flags: flags | EngineFlags::PROCESS_REAL_TIME,
        };

        if self.stale || self.config != Some(wanted) {
            self.engine = None;
        }
        self.config = Some(wanted);
        self.stale = false;

        self.engine.get_or_insert_with(|| E::create(&wanted))
    }
}

impl<E: StretchEngine> Default for EngineSlot<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stretch::testing::ScriptedEngine;

    #[test]
    fn starts_absent_and_builds_lazily() {
        let mut slot = EngineSlot::<ScriptedEngine>::new();
        assert_eq!(slot.state(), SlotState::Absent);
        assert!(slot.engine().is_none());

        slot.ensure_ready(48000.0, EngineFlags::EMPTY);
        assert_eq!(slot.state(), SlotState::Active);
        assert!(slot.engine().is_some());
    }

    #[test]
    fn real_time_flag_is_always_included() {
        let mut slot = EngineSlot::<ScriptedEngine>::new();
        let engine = slot.ensure_ready(48000.0, EngineFlags::ENGINE_FINER);
        assert!(engine.config.flags.contains(EngineFlags::PROCESS_REAL_TIME));
        assert!(engine.config.flags.contains(EngineFlags::ENGINE_FINER));
        assert_eq!(engine.config.channels, CHANNELS);
    }

    #[test]
    fn unchanged_configuration_reuses_the_instance() {
        let mut slot = EngineSlot::<ScriptedEngine>::new();
        let block = [0.0f32; 64];
        slot.ensure_ready(48000.0, EngineFlags::EMPTY)
            .process([&block, &block], false);

        // Same rate and flags: buffered state survives.
        let engine = slot.ensure_ready(48000.0, EngineFlags::EMPTY);
        assert_eq!(engine.frames_in, 64);
    }

    #[test]
    fn stale_mark_replaces_the_instance() {
        let mut slot = EngineSlot::<ScriptedEngine>::new();
        let block = [0.0f32; 64];
        slot.ensure_ready(48000.0, EngineFlags::EMPTY)
            .process([&block, &block], false);

        slot.mark_stale();
        assert_eq!(slot.state(), SlotState::Stale);

        let engine = slot.ensure_ready(48000.0, EngineFlags::SMOOTHING_ON);
        // Fresh instance: the old one's buffered input is gone.
        assert_eq!(engine.frames_in, 0);
        assert!(engine.config.flags.contains(EngineFlags::SMOOTHING_ON));
        assert_eq!(slot.state(), SlotState::Active);
    }

    #[test]
    fn flag_change_alone_replaces_the_instance() {
        let mut slot = EngineSlot::<ScriptedEngine>::new();
        let block = [0.0f32; 32];
        slot.ensure_ready(48000.0, EngineFlags::EMPTY)
            .process([&block, &block], false);

        let engine = slot.ensure_ready(48000.0, EngineFlags::WINDOW_LONG);
        assert_eq!(engine.frames_in, 0);
    }

    #[test]
    fn sample_rate_change_replaces_the_instance() {
        let mut slot = EngineSlot::<ScriptedEngine>::new();
        slot.ensure_ready(44100.0, EngineFlags::EMPTY);
        let engine = slot.ensure_ready(48000.0, EngineFlags::EMPTY);
        assert_eq!(engine.config.sample_rate, 48000.0);
    }

    #[test]
    fn clear_returns_to_absent() {
        let mut slot = EngineSlot::<ScriptedEngine>::new();
        slot.ensure_ready(48000.0, EngineFlags::EMPTY);
        slot.clear();
        assert_eq!(slot.state(), SlotState::Absent);
        assert!(slot.engine().is_none());
    }
}
