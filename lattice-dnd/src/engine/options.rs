//! Engine configuration.
//!
//! [`EngineOptions`] is the complete option set an engine instance is
//! created with. Hosts rarely supply all of it; they hand over an
//! [`OptionsPatch`] whose set fields override the current options, the same
//! way a later object spread overrides an earlier one.
//!
//! Both types deserialize from JSON with camel-cased keys so options can
//! come straight from host configuration.
//!
//! `direction`, `ignore_input_text_selection` and the slide factors describe
//! pointer geometry. They are handed through to a pointer-driven engine;
//! the headless engine addresses drop positions by child index and ignores
//! them.

use serde::{Deserialize, Serialize};

use crate::dom::Axis;
use crate::error::Result;

/// Options an engine instance is created with.
///
/// Predicates (`accepts`, `copy`, ...) are not options; they live in the
/// [`PredicateRegistry`](crate::registry::PredicateRegistry) and can change
/// without recreating the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineOptions {
    /// Axis a pointer-driven engine uses to compute drop positions.
    pub direction: Axis,

    /// Allow reordering inside a copy-mode source container.
    pub copy_sort_source: bool,

    /// Dropping outside any container puts the item back where it was.
    ///
    /// When unset, a moved item stays at its last shadow position.
    pub revert_on_spill: bool,

    /// Dropping outside any container removes the item.
    pub remove_on_spill: bool,

    /// Text selection inside inputs does not start a drag.
    pub ignore_input_text_selection: bool,

    /// Horizontal pointer travel, in pixels, before a drag starts.
    pub slide_factor_x: u32,

    /// Vertical pointer travel, in pixels, before a drag starts.
    pub slide_factor_y: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            direction: Axis::Vertical,
            copy_sort_source: false,
            revert_on_spill: false,
            remove_on_spill: false,
            ignore_input_text_selection: true,
            slide_factor_x: 0,
            slide_factor_y: 0,
        }
    }
}

impl EngineOptions {
    /// Parse a complete option set; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply a patch in place.
    pub fn merge(&mut self, patch: &OptionsPatch) {
        if let Some(direction) = patch.direction {
            self.direction = direction;
        }
        if let Some(enabled) = patch.copy_sort_source {
            self.copy_sort_source = enabled;
        }
        if let Some(enabled) = patch.revert_on_spill {
            self.revert_on_spill = enabled;
        }
        if let Some(enabled) = patch.remove_on_spill {
            self.remove_on_spill = enabled;
        }
        if let Some(enabled) = patch.ignore_input_text_selection {
            self.ignore_input_text_selection = enabled;
        }
        if let Some(pixels) = patch.slide_factor_x {
            self.slide_factor_x = pixels;
        }
        if let Some(pixels) = patch.slide_factor_y {
            self.slide_factor_y = pixels;
        }
    }

    /// A copy of these options with the patch applied.
    pub fn merged(&self, patch: &OptionsPatch) -> Self {
        let mut merged = self.clone();
        merged.merge(patch);
        merged
    }
}

/// A partial option set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_sort_source: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_on_spill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_on_spill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_input_text_selection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide_factor_x: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide_factor_y: Option<u32>,
}

impl OptionsPatch {
    /// An empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn direction(mut self, direction: Axis) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn copy_sort_source(mut self, enabled: bool) -> Self {
        self.copy_sort_source = Some(enabled);
        self
    }

    pub fn revert_on_spill(mut self, enabled: bool) -> Self {
        self.revert_on_spill = Some(enabled);
        self
    }

    pub fn remove_on_spill(mut self, enabled: bool) -> Self {
        self.remove_on_spill = Some(enabled);
        self
    }

    pub fn ignore_input_text_selection(mut self, enabled: bool) -> Self {
        self.ignore_input_text_selection = Some(enabled);
        self
    }

    pub fn slide_factors(mut self, x: u32, y: u32) -> Self {
        self.slide_factor_x = Some(x);
        self.slide_factor_y = Some(y);
        self
    }

    /// Whether the patch sets nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl From<EngineOptions> for OptionsPatch {
    fn from(options: EngineOptions) -> Self {
        Self {
            direction: Some(options.direction),
            copy_sort_source: Some(options.copy_sort_source),
            revert_on_spill: Some(options.revert_on_spill),
            remove_on_spill: Some(options.remove_on_spill),
            ignore_input_text_selection: Some(options.ignore_input_text_selection),
            slide_factor_x: Some(options.slide_factor_x),
            slide_factor_y: Some(options.slide_factor_y),
        }
    }
}
