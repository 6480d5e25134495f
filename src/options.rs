use derive_more::{Display, Error};
use once_cell::sync::Lazy;

use crate::stretch::EngineFlags;

/// Raised when a control message names a value the catalog does not know.
/// The current selection is left untouched.
#[derive(Debug, Display, Error, PartialEq)]
#[display("bad value '{value}' for option '{category}'")]
pub struct OptionError {
    pub category: String,
    pub value: String,
}

struct CatalogEntry {
    category: &'static str,
    value: &'static str,
    flags: EngineFlags,
}

/// Process-wide catalog of every named engine option.
///
/// Built once at first use and read-only afterwards. Categories and values
/// are a closed set; there is no runtime registration beyond this table.
pub struct OptionCatalog {
    entries: Vec<CatalogEntry>,
}

impl OptionCatalog {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn register(&mut self, category: &'static str, value: &'static str, flags: EngineFlags) {
        // Repeating an identical registration is a no-op.
        if self.lookup(category, value).is_none() {
            self.entries.push(CatalogEntry {
                category,
                value,
                flags,
            });
        }
    }

    fn lookup(&self, category: &str, value: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| entry.category == category && entry.value == value)
    }

    pub fn is_valid(&self, category: &str, value: &str) -> bool {
        self.lookup(category, value).is_some()
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.entries.iter().any(|entry| entry.category == category)
    }

    /// Registration order of a category, for deterministic reporting.
    fn category_rank(&self, category: &str) -> usize {
        self.entries
            .iter()
            .position(|entry| entry.category == category)
            .unwrap_or(usize::MAX)
    }

    /// Every `(category, value)` pair, in registration order.
    pub fn list_all(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().map(|entry| (entry.category, entry.value))
    }

    /// Category names, in registration order, without repeats.
    pub fn categories(&self) -> Vec<&'static str> {
        let mut categories = Vec::new();
        for entry in &self.entries {
            if !categories.contains(&entry.category) {
                categories.push(entry.category);
            }
        }
        categories
    }
}

/// The one catalog instance. Lives for the whole process, shared by every
/// plugin instance.
pub fn catalog() -> &'static OptionCatalog {
    static CATALOG: Lazy<OptionCatalog> = Lazy::new(|| {
        let mut catalog = OptionCatalog::new();

        // The first value of each category is the engine default and carries
        // no flag, so an untouched category configures nothing.
        catalog.register("engine", "faster", EngineFlags::EMPTY);
        catalog.register("engine", "finer", EngineFlags::ENGINE_FINER);

        catalog.register("transients", "crisp", EngineFlags::EMPTY);
        catalog.register("transients", "mixed", EngineFlags::TRANSIENTS_MIXED);
        catalog.register("transients", "smooth", EngineFlags::TRANSIENTS_SMOOTH);

        catalog.register("detector", "compound", EngineFlags::EMPTY);
        catalog.register("detector", "percussive", EngineFlags::DETECTOR_PERCUSSIVE);
        catalog.register("detector", "soft", EngineFlags::DETECTOR_SOFT);

        catalog.register("phase", "laminar", EngineFlags::EMPTY);
        catalog.register("phase", "independent", EngineFlags::PHASE_INDEPENDENT);

        catalog.register("window", "standard", EngineFlags::EMPTY);
        catalog.register("window", "short", EngineFlags::WINDOW_SHORT);
        catalog.register("window", "long", EngineFlags::WINDOW_LONG);

        catalog.register("smoothing", "off", EngineFlags::EMPTY);
        catalog.register("smoothing", "on", EngineFlags::SMOOTHING_ON);

        catalog.register("formant", "shifted", EngineFlags::EMPTY);
        catalog.register("formant", "preserved", EngineFlags::FORMANT_PRESERVED);

        catalog.register("priority", "speed", EngineFlags::EMPTY);
        catalog.register("priority", "quality", EngineFlags::PITCH_QUALITY);
        catalog.register("priority", "consistency", EngineFlags::PITCH_CONSISTENCY);

        catalog.register("channel", "apart", EngineFlags::EMPTY);
        catalog.register("channel", "together", EngineFlags::CHANNELS_TOGETHER);

        catalog
    });
    &CATALOG
}

/// One plugin instance's current option selection: at most one value per
/// category, kept in catalog category order.
#[derive(Debug, Default)]
pub struct SelectedOptions {
    selected: Vec<(&'static str, &'static str)>,
}

impl SelectedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `value` for `category` if the catalog knows the pair.
    pub fn set(&mut self, category: &str, value: &str) -> Result<(), OptionError> {
        let catalog = catalog();
        let entry = catalog
            .lookup(category, value)
            .ok_or_else(|| OptionError {
                category: category.to_owned(),
                value: value.to_owned(),
            })?;

        if let Some(slot) = self
            .selected
            .iter_mut()
            .find(|(selected_category, _)| *selected_category == entry.category)
        {
            slot.1 = entry.value;
        } else {
            self.selected.push((entry.category, entry.value));
            self.selected
                .sort_by_key(|(category, _)| catalog.category_rank(category));
        }
        Ok(())
    }

    /// Folds the selection into one engine configuration value.
    pub fn combined_flags(&self) -> EngineFlags {
        let catalog = catalog();
        self.selected
            .iter()
            .filter_map(|(category, value)| catalog.lookup(category, value))
            .fold(EngineFlags::EMPTY, |flags, entry| flags | entry.flags)
    }

    /// Selected `(category, value)` pairs, in catalog category order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.selected.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_knows_every_registered_pair() {
        let catalog = catalog();
        let all: Vec<_> = catalog.list_all().collect();
        assert_eq!(all.len(), 22);
        for (category, value) in all {
            assert!(catalog.is_valid(category, value));
        }
    }

    #[test]
    fn catalog_rejects_unknown_pairs() {
        let catalog = catalog();
        assert!(!catalog.is_valid("engine", "bogus"));
        assert!(!catalog.is_valid("flavor", "vanilla"));
        assert!(catalog.has_category("engine"));
        assert!(!catalog.has_category("flavor"));
    }

    #[test]
    fn set_stores_and_replaces_one_value_per_category() {
        let mut options = SelectedOptions::new();
        options.set("engine", "finer").unwrap();
        options.set("window", "long").unwrap();
        assert_eq!(
            options.iter().collect::<Vec<_>>(),
            vec![("engine", "finer"), ("window", "long")]
        );

        options.set("engine", "faster").unwrap();
        assert_eq!(
            options.iter().collect::<Vec<_>>(),
            vec![("engine", "faster"), ("window", "long")]
        );
    }

    #[test]
    fn every_catalog_pair_can_be_selected_and_reported() {
        for (category, value) in catalog().list_all() {
            let mut options = SelectedOptions::new();
            options.set(category, value).unwrap();
            assert_eq!(
                options.iter().collect::<Vec<_>>(),
                vec![(category, value)]
            );
        }
    }

    #[test]
    fn rejected_value_leaves_selection_unchanged() {
        let mut options = SelectedOptions::new();
        options.set("engine", "finer").unwrap();

        let err = options.set("engine", "bogus").unwrap_err();
        assert_eq!(err.category, "engine");
        assert_eq!(err.value, "bogus");
        assert_eq!(
            options.iter().collect::<Vec<_>>(),
            vec![("engine", "finer")]
        );
    }

    #[test]
    fn repeated_set_is_idempotent() {
        let mut options = SelectedOptions::new();
        options.set("smoothing", "on").unwrap();
        let once: Vec<_> = options.iter().collect();
        options.set("smoothing", "on").unwrap();
        assert_eq!(options.iter().collect::<Vec<_>>(), once);
    }

    #[test]
    fn combined_flags_is_the_union_of_selected_flags() {
        let mut options = SelectedOptions::new();
        assert_eq!(options.combined_flags(), EngineFlags::EMPTY);

        options.set("engine", "finer").unwrap();
        options.set("smoothing", "on").unwrap();
        let flags = options.combined_flags();
        assert!(flags.contains(EngineFlags::ENGINE_FINER));
        assert!(flags.contains(EngineFlags::SMOOTHING_ON));
        assert!(!flags.contains(EngineFlags::WINDOW_SHORT));

        // Default values carry no flags.
        options.set("engine", "faster").unwrap();
        assert_eq!(options.combined_flags(), EngineFlags::SMOOTHING_ON);
    }

    #[test]
    fn selection_order_follows_the_catalog_not_insertion() {
        let mut options = SelectedOptions::new();
        options.set("channel", "together").unwrap();
        options.set("engine", "finer").unwrap();
        options.set("formant", "preserved").unwrap();
        assert_eq!(
            options.iter().collect::<Vec<_>>(),
            vec![
                ("engine", "finer"),
                ("formant", "preserved"),
                ("channel", "together"),
            ]
        );
    }

    #[test]
    fn error_message_names_the_pair() {
        let mut options = SelectedOptions::new();
        let err = options.set("detector", "loud").unwrap_err();
        assert_eq!(err.to_string(), "bad value 'loud' for option 'detector'");
    }
}
