//! The unit database: registries of quantity types, units and
//! categories.
//!
//! Quantity types represent the physical dimension family, for
//! instance length or temperature, as strings. Every quantity type has
//! one base unit and one or more units associated with it. Categories
//! are application-level names bound to a quantity type, carrying
//! their own default unit, default value and range.
//!
//! There is no process-wide singleton: callers create a database, fill
//! it during bootstrap (`&mut self` methods) and from then on pass a
//! shared `&UnitDatabase` handle into every conversion or arithmetic
//! call. The only interior mutability is a pair of memoization caches,
//! both safe under concurrent readers.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::category::{default_caption, CategoryInfo, CategorySpec};
use crate::convert::ConversionHandler;
use crate::error::{Result, UnitsError};
use crate::quantity::{Quantity, QuantityEntry};
use crate::unit::{ConversionFn, UnitInfo};

/// Registry with all the available quantity types, units and
/// categories.
#[derive(Default)]
pub struct UnitDatabase {
    /// Units per quantity type. The first entry is the base unit, by
    /// convention; `base_unit` relies on it.
    quantity_types: HashMap<String, Vec<UnitInfo>>,
    /// Global symbol lookup (symbols are unique across quantity
    /// types).
    unit_to_info: HashMap<String, UnitInfo>,
    categories: HashMap<String, CategoryInfo>,
    /// Registered handlers for custom value types, keyed by type tag.
    pub(crate) conversion_handlers: HashMap<String, ConversionHandler>,
    /// Identity cache for quantities: structurally equal quantities
    /// share one allocation. Racing insertions are idempotent.
    pub(crate) quantities_cache: Mutex<HashMap<Vec<QuantityEntry>, Arc<Quantity>>>,
    /// Memoized category/unit validity checks.
    category_unit_valid: Mutex<HashMap<(String, String), bool>>,
}

impl UnitDatabase {
    /// Creates an empty database, without any quantity types.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------- units

    /// Registers a new unit under `quantity_type`.
    ///
    /// `to_base` converts a value in this unit to the base unit,
    /// `from_base` the other way around. The pair must round-trip
    /// within floating tolerance; that property is verified by tests,
    /// not at registration.
    pub fn add_unit(
        &mut self,
        quantity_type: &str,
        name: &str,
        unit: &str,
        to_base: ConversionFn,
        from_base: ConversionFn,
        default_category: Option<&str>,
    ) -> Result<()> {
        let info = UnitInfo::new(
            quantity_type,
            name,
            unit,
            to_base,
            from_base,
            default_category.map(str::to_string),
        );
        self.insert_unit(info)
    }

    /// Registers the base unit of `quantity_type`: its conversion
    /// functions are the identity, and it becomes first in iteration
    /// order for its quantity type.
    pub fn add_base_unit(&mut self, quantity_type: &str, name: &str, unit: &str) -> Result<()> {
        if let Some(infos) = self.quantity_types.get(quantity_type) {
            if let Some(base) = infos.first().filter(|base| !base.has_conversion()) {
                return Err(UnitsError::DuplicateBaseUnit {
                    quantity_type: quantity_type.to_string(),
                    base_unit: base.unit.clone(),
                    unit: unit.to_string(),
                });
            }
        }
        self.insert_unit(UnitInfo::identity(quantity_type, name, unit))?;
        // The base goes to the first position, by convention.
        if let Some(infos) = self.quantity_types.get_mut(quantity_type) {
            if let Some(base) = infos.pop() {
                infos.insert(0, base);
            }
        }
        Ok(())
    }

    fn insert_unit(&mut self, info: UnitInfo) -> Result<()> {
        if let Some(existing) = self.unit_to_info.get(&info.unit) {
            return Err(UnitsError::DuplicateUnit {
                unit: info.unit.clone(),
                existing_quantity_type: existing.quantity_type.clone(),
                quantity_type: info.quantity_type.clone(),
            });
        }
        debug!(unit = %info.unit, quantity_type = %info.quantity_type, "unit registered");
        self.unit_to_info.insert(info.unit.clone(), info.clone());
        self.quantity_types
            .entry(info.quantity_type.clone())
            .or_default()
            .push(info);
        Ok(())
    }

    /// The base unit of the given quantity type.
    pub fn base_unit(&self, quantity_type: &str) -> Result<&str> {
        let infos = self.infos(quantity_type)?;
        Ok(&infos[0].unit)
    }

    /// The unit symbols registered under `quantity_type`.
    pub fn units(&self, quantity_type: &str) -> Result<Vec<&str>> {
        Ok(self.infos(quantity_type)?.iter().map(|i| i.unit.as_str()).collect())
    }

    /// Every registered unit symbol, across all quantity types.
    pub fn all_units(&self) -> Vec<&str> {
        let mut units: Vec<&str> = self.unit_to_info.keys().map(String::as_str).collect();
        units.sort_unstable();
        units
    }

    /// All [`UnitInfo`]s of a quantity type (base unit first).
    pub fn infos(&self, quantity_type: &str) -> Result<&[UnitInfo]> {
        self.quantity_types
            .get(quantity_type)
            .map(Vec::as_slice)
            .ok_or_else(|| self.invalid_quantity_type(quantity_type))
    }

    /// Looks up a unit under a quantity type or category name.
    ///
    /// A category name is resolved to its quantity type first. An
    /// unknown unit under a known quantity type reports the valid
    /// units.
    pub fn unit_info(&self, quantity_type: &str, unit: &str) -> Result<&UnitInfo> {
        // Common case: the unit matches the quantity type registered.
        if let Some(info) = self.unit_to_info.get(unit) {
            if info.quantity_type == quantity_type {
                return Ok(info);
            }
        }
        let quantity_type = match self.categories.get(quantity_type) {
            Some(category_info) => category_info.quantity_type.as_str(),
            None => quantity_type,
        };
        let infos = self.infos(quantity_type)?;
        infos.iter().find(|i| i.unit == unit).ok_or_else(|| {
            let mut valid_units: Vec<String> = infos.iter().map(|i| i.unit.clone()).collect();
            valid_units.sort_unstable();
            UnitsError::InvalidUnit {
                unit: unit.to_string(),
                quantity_type: Some(quantity_type.to_string()),
                category: None,
                valid_units,
            }
        })
    }

    /// The user-friendly name of a unit.
    pub fn unit_name(&self, quantity_type: &str, unit: &str) -> Result<&str> {
        Ok(&self.unit_info(quantity_type, unit)?.name)
    }

    /// The quantity type that contains the given unit, if any.
    pub fn quantity_type_of_unit(&self, unit: &str) -> Option<&str> {
        self.unit_to_info.get(unit).map(|i| i.quantity_type.as_str())
    }

    /// The default category for a unit: the one it was registered
    /// with, falling back to a category named after its quantity type.
    pub fn default_category_of_unit(&self, unit: &str) -> Option<&str> {
        let info = self.unit_to_info.get(unit)?;
        if let Some(category) = &info.default_category {
            return Some(category);
        }
        self.categories
            .contains_key(&info.quantity_type)
            .then_some(info.quantity_type.as_str())
    }

    /// The registered quantity types, sorted.
    pub fn quantity_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.quantity_types.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Fails with [`UnitsError::InvalidQuantityType`] unless the
    /// quantity type is registered.
    pub fn check_quantity_type(&self, quantity_type: &str) -> Result<()> {
        if self.quantity_types.contains_key(quantity_type) {
            Ok(())
        } else {
            Err(self.invalid_quantity_type(quantity_type))
        }
    }

    /// Fails unless the quantity type has the given unit.
    pub fn check_quantity_type_unit(&self, quantity_type: &str, unit: &str) -> Result<()> {
        self.unit_info(quantity_type, unit).map(|_| ())
    }

    fn invalid_quantity_type(&self, quantity_type: &str) -> UnitsError {
        let mut available: Vec<String> = self.quantity_types.keys().cloned().collect();
        available.sort_unstable();
        UnitsError::InvalidQuantityType {
            quantity_type: quantity_type.to_string(),
            available,
        }
    }

    // -------------------------------------------------- categories

    /// Registers a category. Fails with
    /// [`UnitsError::CategoryAlreadyRegistered`] if it exists, unless
    /// `overwrite` is set (an explicit, intentional override path for
    /// tests and reconfiguration).
    pub fn add_category(&mut self, spec: CategorySpec, overwrite: bool) -> Result<&CategoryInfo> {
        let CategorySpec {
            category,
            quantity_type,
            valid_units,
            default_unit,
            default_value,
            min_value,
            max_value,
            is_min_exclusive,
            is_max_exclusive,
            caption,
        } = spec;

        if !overwrite && self.categories.contains_key(&category) {
            return Err(UnitsError::CategoryAlreadyRegistered { category });
        }

        if let (Some(min), Some(max)) = (min_value, max_value) {
            if max < min {
                return Err(UnitsError::InvalidCategorySpec {
                    category,
                    reason: format!("min_value ({min}) must be <= than max_value ({max})"),
                });
            }
        }

        if let Some(valid_units) = &valid_units {
            for unit in valid_units {
                // Unknown quantity types surface here too.
                self.check_quantity_type_unit(&quantity_type, unit)?;
            }
        }

        let default_unit = match default_unit {
            Some(unit) => {
                self.check_quantity_type_unit(&quantity_type, &unit)?;
                unit
            }
            None => {
                let base = self.base_unit(&quantity_type)?;
                match &valid_units {
                    Some(units) if !units.is_empty() && !units.iter().any(|u| u == base) => {
                        units[0].clone()
                    }
                    _ => base.to_string(),
                }
            }
        };

        let caption = caption.unwrap_or_else(|| default_caption(&category));

        // If the default value has not been passed: the min bound if
        // defined, else the max bound, else zero. Exclusive bounds
        // leave no bound value to fall back on.
        let default_value = match default_value {
            None => {
                if is_min_exclusive || is_max_exclusive {
                    return Err(UnitsError::InvalidCategorySpec {
                        category,
                        reason: "default_value must be supplied when a bound is exclusive"
                            .to_string(),
                    });
                }
                min_value.or(max_value).unwrap_or(0.0)
            }
            Some(value) => {
                let check = |ok: bool, comparison: &str, limit: f64| -> Result<()> {
                    if ok {
                        Ok(())
                    } else {
                        Err(UnitsError::InvalidCategorySpec {
                            category: category.clone(),
                            reason: format!(
                                "default_value {value} must be {comparison} {limit}"
                            ),
                        })
                    }
                };
                if let Some(min) = min_value {
                    if is_min_exclusive {
                        check(value > min, ">", min)?;
                    } else {
                        check(value >= min, ">=", min)?;
                    }
                }
                if let Some(max) = max_value {
                    if is_max_exclusive {
                        check(value < max, "<", max)?;
                    } else {
                        check(value <= max, "<=", max)?;
                    }
                }
                value
            }
        };

        debug!(category = %category, quantity_type = %quantity_type, "category registered");
        let info = CategoryInfo {
            category: category.clone(),
            quantity_type,
            valid_units,
            default_unit,
            default_value,
            min_value,
            max_value,
            is_min_exclusive,
            is_max_exclusive,
            caption,
        };
        // Overwriting invalidates the memoized category/unit checks.
        if overwrite {
            self.category_unit_valid.lock().unwrap().clear();
        }
        let stored = match self.categories.entry(category) {
            Entry::Occupied(mut entry) => {
                entry.insert(info);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(info),
        };
        Ok(stored)
    }

    /// Whether the given category is registered.
    pub fn is_valid_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// Iterates over the registered category names.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// The category info for the given category.
    pub fn category_info(&self, category: &str) -> Result<&CategoryInfo> {
        self.categories.get(category).ok_or_else(|| {
            let mut available: Vec<String> = self.categories.keys().cloned().collect();
            available.sort_unstable();
            UnitsError::InvalidQuantityType {
                quantity_type: category.to_string(),
                available,
            }
        })
    }

    /// The quantity type of a category.
    pub fn category_quantity_type(&self, category: &str) -> Result<&str> {
        Ok(&self.category_info(category)?.quantity_type)
    }

    /// The valid units of a category. Falls back to the full
    /// quantity-type unit list when the category declares no explicit
    /// subset. The empty category (of the empty quantity) has no valid
    /// units.
    pub fn valid_units(&self, category: &str) -> Result<Vec<String>> {
        if category.is_empty() {
            return Ok(Vec::new());
        }
        let info = self.category_info(category)?;
        if let Some(valid_units) = &info.valid_units {
            return Ok(valid_units.clone());
        }
        if info.quantity_type != category && self.is_valid_category(&info.quantity_type) {
            return self.valid_units(&info.quantity_type);
        }
        Ok(self
            .units(&info.quantity_type)?
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// The default unit of a category. Never empty: registration
    /// resolves an omitted default to the base unit.
    pub fn default_unit(&self, category: &str) -> Result<&str> {
        Ok(&self.category_info(category)?.default_unit)
    }

    /// The default value of a category.
    pub fn default_value(&self, category: &str) -> Result<f64> {
        Ok(self.category_info(category)?.default_value)
    }

    /// Checks if the given category accepts the passed unit.
    ///
    /// Deliberately validates against the category's *quantity type*,
    /// not its `valid_units` subset: the subset only filters units in
    /// the UI, any unit of the quantity type may be set on a value.
    pub fn check_category_unit(&self, category: &str, unit: &str) -> Result<()> {
        let key = (category.to_string(), unit.to_string());
        let memo = self.category_unit_valid.lock().unwrap().get(&key).copied();
        let valid = match memo {
            Some(valid) => valid,
            None => {
                let valid = self
                    .category_info(category)
                    .and_then(|info| self.check_quantity_type_unit(&info.quantity_type, unit))
                    .is_ok();
                self.category_unit_valid.lock().unwrap().insert(key, valid);
                valid
            }
        };
        if valid {
            Ok(())
        } else {
            Err(UnitsError::InvalidUnit {
                unit: unit.to_string(),
                quantity_type: None,
                category: Some(category.to_string()),
                valid_units: Vec::new(),
            })
        }
    }

    /// Checks a value against the range of a category, in the given
    /// unit (the category default unit when omitted).
    pub fn check_value_for_category(
        &self,
        category: &str,
        value: f64,
        unit: Option<&str>,
    ) -> Result<()> {
        let quantity = match unit {
            Some(unit) => self.obtain_quantity(unit, Some(category))?,
            None => self.obtain_category_quantity(category)?,
        };
        quantity.check_value(self, value)
    }

    /// Removes every registered quantity type, unit and category, and
    /// empties the caches.
    pub fn clear(&mut self) {
        self.quantity_types.clear();
        self.unit_to_info.clear();
        self.categories.clear();
        self.quantities_cache.lock().unwrap().clear();
        self.category_unit_valid.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::fill_simple;
    use std::sync::Arc as StdArc;

    fn simple_db() -> UnitDatabase {
        let mut db = UnitDatabase::new();
        fill_simple(&mut db).unwrap();
        db
    }

    #[test]
    fn test_base_unit_is_first() {
        let db = simple_db();
        assert_eq!(db.base_unit("length").unwrap(), "m");
        assert_eq!(db.units("length").unwrap()[0], "m");
        assert_eq!(db.base_unit("time").unwrap(), "s");
    }

    #[test]
    fn test_duplicate_symbol_is_global() {
        let mut db = simple_db();
        let err = db
            .add_unit(
                "time",
                "meters again",
                "m",
                StdArc::new(|x| x),
                StdArc::new(|x| x),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, UnitsError::DuplicateUnit { .. }));
        let msg = err.to_string();
        assert!(msg.contains("'m'"));
        assert!(msg.contains("length"));
    }

    #[test]
    fn test_second_base_unit_rejected() {
        let mut db = simple_db();
        let err = db.add_base_unit("length", "furlong", "fur").unwrap_err();
        assert!(matches!(err, UnitsError::DuplicateBaseUnit { .. }));
        // The message names the existing base, not just the newcomer.
        let msg = err.to_string();
        assert!(msg.contains("'m'"));
        assert!(msg.contains("'fur'"));
        assert!(msg.contains("length"));
    }

    #[test]
    fn test_unknown_quantity_type_lists_available() {
        let db = simple_db();
        let err = db.units("temperature").unwrap_err();
        match err {
            UnitsError::InvalidQuantityType { quantity_type, available } => {
                assert_eq!(quantity_type, "temperature");
                assert_eq!(available, vec!["length".to_string(), "time".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_unit_lists_valid_units() {
        let db = simple_db();
        let err = db.unit_info("length", "ft").unwrap_err();
        match err {
            UnitsError::InvalidUnit { unit, quantity_type, valid_units, .. } => {
                assert_eq!(unit, "ft");
                assert_eq!(quantity_type.as_deref(), Some("length"));
                assert_eq!(valid_units, vec!["cm", "km", "m", "mm"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unit_lookup_through_category_name() {
        let mut db = simple_db();
        db.add_category(CategorySpec::new("well depth", "length"), false).unwrap();
        assert_eq!(db.unit_info("well depth", "cm").unwrap().name, "centimeters");
    }

    #[test]
    fn test_category_default_unit_falls_back_to_base() {
        let mut db = simple_db();
        db.add_category(CategorySpec::new("depth", "length"), false).unwrap();
        assert_eq!(db.default_unit("depth").unwrap(), "m");
        assert_eq!(db.default_value("depth").unwrap(), 0.0);
    }

    #[test]
    fn test_category_default_unit_prefers_valid_subset() {
        let mut db = simple_db();
        db.add_category(
            CategorySpec::new("pipe diameter", "length").valid_units(["cm", "mm"]),
            false,
        )
        .unwrap();
        assert_eq!(db.default_unit("pipe diameter").unwrap(), "cm");
    }

    #[test]
    fn test_category_valid_units_fall_back_to_quantity_type() {
        let mut db = simple_db();
        db.add_category(CategorySpec::new("depth", "length"), false).unwrap();
        assert_eq!(db.valid_units("depth").unwrap(), vec!["m", "mm", "cm", "km"]);
        assert_eq!(db.valid_units("length").unwrap(), vec!["m", "mm", "cm", "km"]);
    }

    #[test]
    fn test_category_already_registered() {
        let mut db = simple_db();
        let err = db
            .add_category(CategorySpec::new("length", "length"), false)
            .unwrap_err();
        assert!(matches!(err, UnitsError::CategoryAlreadyRegistered { .. }));
        // And the explicit override path.
        db.add_category(
            CategorySpec::new("length", "length").default_unit("km"),
            true,
        )
        .unwrap();
        assert_eq!(db.default_unit("length").unwrap(), "km");
    }

    #[test]
    fn test_category_rejects_foreign_default_unit() {
        let mut db = simple_db();
        let err = db
            .add_category(CategorySpec::new("depth", "length").default_unit("s"), false)
            .unwrap_err();
        assert!(matches!(err, UnitsError::InvalidUnit { .. }));
    }

    #[test]
    fn test_category_rejects_foreign_valid_units() {
        let mut db = simple_db();
        let err = db
            .add_category(
                CategorySpec::new("depth", "length").valid_units(["m", "s"]),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, UnitsError::InvalidUnit { .. }));
    }

    #[test]
    fn test_category_default_value_resolution() {
        let mut db = simple_db();
        db.add_category(CategorySpec::new("a", "length").min_value(5.0), false).unwrap();
        assert_eq!(db.default_value("a").unwrap(), 5.0);
        db.add_category(CategorySpec::new("b", "length").max_value(-2.0), false).unwrap();
        assert_eq!(db.default_value("b").unwrap(), -2.0);
    }

    #[test]
    fn test_exclusive_bound_requires_default_value() {
        let mut db = simple_db();
        let err = db
            .add_category(
                CategorySpec::new("c", "length").min_value(0.0).exclusive_min(),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, UnitsError::InvalidCategorySpec { .. }));
    }

    #[test]
    fn test_default_value_must_satisfy_bounds() {
        let mut db = simple_db();
        let err = db
            .add_category(
                CategorySpec::new("d", "length").min_value(0.0).default_value(-1.0),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, UnitsError::InvalidCategorySpec { .. }));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut db = simple_db();
        let err = db
            .add_category(
                CategorySpec::new("e", "length").min_value(10.0).max_value(1.0),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, UnitsError::InvalidCategorySpec { .. }));
    }

    #[test]
    fn test_check_category_unit_ignores_valid_units_subset() {
        // The valid-units subset filters the UI only; any unit of the
        // quantity type is accepted when set on a value.
        let mut db = simple_db();
        db.add_category(
            CategorySpec::new("depth", "length").valid_units(["m", "cm"]),
            false,
        )
        .unwrap();
        db.check_category_unit("depth", "km").unwrap();
        let err = db.check_category_unit("depth", "s").unwrap_err();
        assert!(matches!(err, UnitsError::InvalidUnit { .. }));
        // Memoized second call behaves identically.
        assert!(db.check_category_unit("depth", "s").is_err());
        assert!(db.check_category_unit("depth", "km").is_ok());
    }

    #[test]
    fn test_default_category_of_unit() {
        let mut db = simple_db();
        db.add_unit(
            "length",
            "inches",
            "in",
            StdArc::new(|x| x * 0.0254),
            StdArc::new(|x| x / 0.0254),
            Some("length"),
        )
        .unwrap();
        assert_eq!(db.default_category_of_unit("in"), Some("length"));
        // Without an explicit default, falls back to the category
        // named after the quantity type.
        assert_eq!(db.default_category_of_unit("cm"), Some("length"));
        assert_eq!(db.default_category_of_unit("nope"), None);
    }

    #[test]
    fn test_clear() {
        let mut db = simple_db();
        db.clear();
        assert!(db.quantity_types().is_empty());
        assert!(!db.is_valid_category("length"));
        assert!(db.all_units().is_empty());
    }

    #[test]
    fn test_caption_defaults_to_title_case() {
        let mut db = simple_db();
        let info = db
            .add_category(CategorySpec::new("volume per time", "length"), false)
            .unwrap();
        assert_eq!(info.caption, "Volume per Time");
    }
}
