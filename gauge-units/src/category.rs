//! Category definitions.
//!
//! A category is an application-level named usage of a quantity type:
//! "depth" and "height" can both map to the quantity type "length",
//! each with its own default unit, default value and range.

use serde::{Deserialize, Serialize};

/// Words kept lower-case when a caption is derived from the category
/// name.
const PREPOSITIONS_IN_CATEGORY_NAME: &[&str] = &["per", "of"];

/// Holds information about a registered category.
///
/// Immutable after registration; replaced wholesale when a category is
/// re-registered with the overwrite flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    /// Category name (unique key).
    pub category: String,
    /// The quantity type this category maps to.
    pub quantity_type: String,
    /// Explicit subset of valid units, if given. Advisory: used for
    /// UI filtering, not enforced when a unit is set on a value.
    pub valid_units: Option<Vec<String>>,
    /// Default unit for new values of this category.
    pub default_unit: String,
    /// Default value for new values of this category.
    pub default_value: f64,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub is_min_exclusive: bool,
    pub is_max_exclusive: bool,
    /// User-friendly caption.
    pub caption: String,
}

/// Input for [`UnitDatabase::add_category`](crate::UnitDatabase::add_category).
///
/// Everything except the category name and quantity type is optional;
/// the database resolves the omitted pieces during registration (base
/// unit as default unit, bounds-derived default value, title-cased
/// caption).
#[derive(Debug, Clone, Default)]
pub struct CategorySpec {
    pub category: String,
    pub quantity_type: String,
    pub valid_units: Option<Vec<String>>,
    pub default_unit: Option<String>,
    pub default_value: Option<f64>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub is_min_exclusive: bool,
    pub is_max_exclusive: bool,
    pub caption: Option<String>,
}

impl CategorySpec {
    pub fn new(category: impl Into<String>, quantity_type: impl Into<String>) -> Self {
        CategorySpec {
            category: category.into(),
            quantity_type: quantity_type.into(),
            ..Default::default()
        }
    }

    pub fn valid_units(mut self, units: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.valid_units = Some(units.into_iter().map(Into::into).collect());
        self
    }

    pub fn default_unit(mut self, unit: impl Into<String>) -> Self {
        self.default_unit = Some(unit.into());
        self
    }

    pub fn default_value(mut self, value: f64) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn min_value(mut self, value: f64) -> Self {
        self.min_value = Some(value);
        self
    }

    pub fn max_value(mut self, value: f64) -> Self {
        self.max_value = Some(value);
        self
    }

    pub fn exclusive_min(mut self) -> Self {
        self.is_min_exclusive = true;
        self
    }

    pub fn exclusive_max(mut self) -> Self {
        self.is_max_exclusive = true;
        self
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Derives a caption from a category name: title-case each word,
/// leaving prepositions alone ("volume per time" -> "Volume per
/// Time").
pub(crate) fn default_caption(category: &str) -> String {
    category
        .split(' ')
        .map(|word| {
            if PREPOSITIONS_IN_CATEGORY_NAME.contains(&word) {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_caption_title_cases() {
        assert_eq!(default_caption("flow rate"), "Flow Rate");
        assert_eq!(default_caption("length"), "Length");
    }

    #[test]
    fn test_default_caption_keeps_prepositions() {
        assert_eq!(default_caption("volume per time"), "Volume per Time");
        assert_eq!(default_caption("amount of substance"), "Amount of Substance");
    }

    #[test]
    fn test_spec_builder() {
        let spec = CategorySpec::new("well depth", "length")
            .default_unit("m")
            .min_value(0.0)
            .caption("Well Depth");
        assert_eq!(spec.category, "well depth");
        assert_eq!(spec.quantity_type, "length");
        assert_eq!(spec.default_unit.as_deref(), Some("m"));
        assert_eq!(spec.min_value, Some(0.0));
        assert!(!spec.is_min_exclusive);
    }
}
