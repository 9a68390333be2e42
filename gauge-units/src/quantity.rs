//! The immutable quantity: what kind of thing a number is.
//!
//! A quantity is an ordered mapping from category to (unit, exponent).
//! Three shapes exist: the empty quantity (neutral element of
//! derived-quantity composition), the simple quantity (one entry with
//! exponent 1, the common case) and derived quantities produced by
//! multiplying or dividing (e.g. area as `{length: (m, 2)}`).
//!
//! Quantities are obtained through the database
//! ([`UnitDatabase::obtain_quantity`] and friends), which hands out
//! shared `Arc`s from a content-keyed identity cache: structurally
//! equal quantities are one allocation, and the sharing can never leak
//! mutability because `Quantity` has no mutating surface.

use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

use crate::convert::Value;
use crate::database::UnitDatabase;
use crate::error::{Result, UnitsError};

static EMPTY: LazyLock<Arc<Quantity>> = LazyLock::new(|| Arc::new(Quantity { entries: Vec::new() }));

/// One category -> (unit, exponent) term of a quantity.
///
/// Invariant: `exp` is never zero; zero-exponent terms are dropped at
/// construction and composition time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantityEntry {
    pub category: String,
    pub unit: String,
    pub exp: i32,
}

impl QuantityEntry {
    pub fn new(category: impl Into<String>, unit: impl Into<String>, exp: i32) -> Self {
        QuantityEntry {
            category: category.into(),
            unit: unit.into(),
            exp,
        }
    }
}

/// An immutable quantity with its associated categories, units and
/// exponents.
///
/// Equality and hashing consider the ordered entry list: insertion
/// order is part of a quantity's identity, since it affects the
/// derived captions and unit strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Quantity {
    entries: Vec<QuantityEntry>,
}

/// Composing categories or units of a quantity.
///
/// The simple quantity deliberately exposes the bare string instead of
/// a one-element structure, to keep the common call sites simple.
#[derive(Debug, Clone, PartialEq)]
pub enum Composition<'a> {
    Simple(&'a str),
    Derived(Vec<&'a str>),
}

/// Composing (unit, exponent) pairs of a quantity; bare unit for the
/// simple case.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitComposition<'a> {
    Simple(&'a str),
    Derived(Vec<(&'a str, i32)>),
}

impl Quantity {
    pub(crate) fn from_entries(entries: Vec<QuantityEntry>) -> Self {
        Quantity { entries }
    }

    /// The shared quantity without any internal unit; the neutral
    /// element in derived-quantity composition.
    pub fn empty() -> Arc<Quantity> {
        EMPTY.clone()
    }

    /// Whether this quantity has no composing units at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this quantity has derived units (anything but exactly
    /// one entry of exponent 1; the empty quantity counts as derived).
    pub fn is_derived(&self) -> bool {
        self.entries.len() != 1 || self.entries[0].exp != 1
    }

    /// The ordered category -> (unit, exponent) terms.
    pub fn entries(&self) -> &[QuantityEntry] {
        &self.entries
    }

    /// The category: the bare name for a simple quantity, a composed
    /// expression such as `(length) ** 2` for derived ones.
    pub fn category(&self) -> String {
        if !self.is_derived() {
            return self.entries[0].category.clone();
        }
        make_expression_str(self.entries.iter().map(|e| (e.category.as_str(), e.exp)))
    }

    /// The unit: the bare symbol for a simple quantity, the joined
    /// exponent form (`m2`, `1/m`, `m/s`) for derived ones.
    pub fn unit(&self) -> String {
        if !self.is_derived() {
            return self.entries[0].unit.clone();
        }
        make_unit_str(
            self.composing_units_joining_exponents()
                .iter()
                .map(|(unit, exp)| (unit.as_str(), *exp)),
        )
    }

    /// The quantity type, resolved through the database: bare for
    /// simple quantities, a composed expression for derived ones
    /// (exponents of repeated quantity types are joined).
    pub fn quantity_type(&self, db: &UnitDatabase) -> Result<String> {
        if !self.is_derived() {
            return Ok(db.category_quantity_type(&self.entries[0].category)?.to_string());
        }
        let mut joined: Vec<(String, i32)> = Vec::new();
        for entry in &self.entries {
            let quantity_type = db.category_quantity_type(&entry.category)?;
            match joined.iter_mut().find(|(qt, _)| qt.as_str() == quantity_type) {
                Some((_, exp)) => *exp += entry.exp,
                None => joined.push((quantity_type.to_string(), entry.exp)),
            }
        }
        Ok(make_expression_str(joined.iter().map(|(qt, exp)| (qt.as_str(), *exp))))
    }

    /// The composing categories; bare for the simple case.
    pub fn composing_categories(&self) -> Composition<'_> {
        if !self.is_derived() {
            Composition::Simple(&self.entries[0].category)
        } else {
            Composition::Derived(self.entries.iter().map(|e| e.category.as_str()).collect())
        }
    }

    /// The composing (unit, exponent) pairs; bare unit for the simple
    /// case.
    pub fn composing_units(&self) -> UnitComposition<'_> {
        if !self.is_derived() {
            UnitComposition::Simple(&self.entries[0].unit)
        } else {
            UnitComposition::Derived(
                self.entries.iter().map(|e| (e.unit.as_str(), e.exp)).collect(),
            )
        }
    }

    /// The (unit, exponent) pairs with repeated units merged, in
    /// insertion order. Two quantities combine in arithmetic exactly
    /// when these multisets match.
    pub fn composing_units_joining_exponents(&self) -> Vec<(String, i32)> {
        let mut joined: Vec<(String, i32)> = Vec::new();
        for entry in &self.entries {
            match joined.iter_mut().find(|(unit, _)| *unit == entry.unit) {
                Some((_, exp)) => *exp += entry.exp,
                None => joined.push((entry.unit.clone(), entry.exp)),
            }
        }
        joined
    }

    /// The user-friendly caption: the category caption for a simple
    /// quantity, the composed category expression otherwise.
    pub fn caption(&self, db: &UnitDatabase) -> Result<String> {
        if !self.is_derived() {
            return Ok(db.category_info(&self.entries[0].category)?.caption.clone());
        }
        Ok(self.category())
    }

    /// A description of the unit using unit names instead of symbols,
    /// e.g. `(meters) ** 2`.
    pub fn unit_name(&self, db: &UnitDatabase) -> Result<String> {
        let mut joined: Vec<(String, i32)> = Vec::new();
        for entry in &self.entries {
            let quantity_type = db.category_quantity_type(&entry.category)?;
            let name = db.unit_name(quantity_type, &entry.unit)?;
            match joined.iter_mut().find(|(n, _)| n.as_str() == name) {
                Some((_, exp)) => *exp += entry.exp,
                None => joined.push((name.to_string(), entry.exp)),
            }
        }
        Ok(make_expression_str(joined.iter().map(|(name, exp)| (name.as_str(), *exp))))
    }

    /// Shortcut for the valid units of this quantity's category.
    pub fn valid_units(&self, db: &UnitDatabase) -> Result<Vec<String>> {
        db.valid_units(&self.category())
    }

    /// Checks the value against the range of this quantity's category,
    /// converting to the category's default unit first when needed.
    /// Derived and empty quantities have no single range and always
    /// pass.
    pub fn check_value(&self, db: &UnitDatabase, value: f64) -> Result<()> {
        if self.is_derived() {
            return Ok(());
        }
        let entry = &self.entries[0];
        let info = db.category_info(&entry.category)?;
        if info.min_value.is_none() && info.max_value.is_none() {
            return Ok(());
        }
        let mut checked = value;
        if entry.unit != info.default_unit {
            checked = self.convert_scalar_value(db, value, &info.default_unit)?;
        }
        let out_of_range = |comparison: &'static str, limit: f64| UnitsError::ValueOutOfRange {
            caption: info.caption.clone(),
            value: checked,
            comparison,
            limit,
        };
        if let Some(min) = info.min_value {
            if info.is_min_exclusive {
                if checked <= min {
                    return Err(out_of_range(">", min));
                }
            } else if checked < min {
                return Err(out_of_range(">=", min));
            }
        }
        if let Some(max) = info.max_value {
            if info.is_max_exclusive {
                if checked >= max {
                    return Err(out_of_range("<", max));
                }
            } else if checked > max {
                return Err(out_of_range("<=", max));
            }
        }
        Ok(())
    }

    /// Converts a scalar value from this quantity's unit to `to_unit`.
    ///
    /// Optimized path for the simple quantity; derived quantities go
    /// through the composed conversion, which only supports a single
    /// term.
    pub fn convert_scalar_value(&self, db: &UnitDatabase, value: f64, to_unit: &str) -> Result<f64> {
        if !self.is_derived() {
            let entry = &self.entries[0];
            if entry.unit == to_unit {
                return Ok(value);
            }
            let from_info = db.unit_info(&entry.category, &entry.unit)?;
            let to_info = db.unit_info(&entry.category, to_unit)?;
            return Ok(to_info.from_base(from_info.to_base(value)));
        }
        db.convert_composition(&self.entries, to_unit, value)
    }

    /// Converts any supported value shape to `to_unit`.
    pub fn convert(&self, db: &UnitDatabase, value: &Value, to_unit: &str) -> Result<Value> {
        if !self.is_derived() {
            let entry = &self.entries[0];
            return db.convert_value(&entry.category, &entry.unit, to_unit, value);
        }
        match value {
            Value::Scalar(x) => Ok(Value::Scalar(db.convert_composition(&self.entries, to_unit, *x)?)),
            Value::Sequence(xs) => {
                let converted: Result<Vec<f64>> = xs
                    .iter()
                    .map(|x| db.convert_composition(&self.entries, to_unit, *x))
                    .collect();
                Ok(Value::Sequence(converted?))
            }
            Value::FixedSequence(xs) => {
                let converted: Result<Vec<f64>> = xs
                    .iter()
                    .map(|x| db.convert_composition(&self.entries, to_unit, *x))
                    .collect();
                Ok(Value::FixedSequence(converted?.into_boxed_slice()))
            }
            Value::Custom(_) => Err(UnitsError::ComposedConversion { unit: self.unit() }),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.unit())
    }
}

/// Builds an expression such as `(length) ** 2`, `1 / s` or
/// `m * kg / s` from (name, exponent) pairs. Zero exponents are
/// skipped.
fn make_expression_str<'a>(pairs: impl Iterator<Item = (&'a str, i32)> + Clone) -> String {
    let mut ret = String::new();
    for (name, exp) in pairs.clone() {
        if exp > 0 {
            if !ret.is_empty() {
                ret.push_str(" * ");
            }
            if exp != 1 {
                ret.push_str(&format!("({name}) ** {exp}"));
            } else {
                ret.push_str(name);
            }
        }
    }
    let mut added_div = false;
    for (name, exp) in pairs {
        if exp < 0 {
            if !added_div {
                added_div = true;
                if !ret.is_empty() {
                    ret.push_str(" / ");
                } else {
                    ret.push_str("1 / ");
                }
            }
            if exp != -1 {
                ret.push_str(&format!("({name}) ** {}", exp.abs()));
            } else {
                ret.push_str(name);
            }
        }
    }
    ret
}

/// Builds the compact unit string shown to users: `m2`, `1/m`, `m/s`,
/// `m3/s2`.
fn make_unit_str<'a>(pairs: impl Iterator<Item = (&'a str, i32)> + Clone) -> String {
    let mut ret = String::new();
    for (unit, exp) in pairs.clone() {
        if exp > 0 {
            if !ret.is_empty() {
                ret.push('.');
            }
            ret.push_str(unit);
            if exp != 1 {
                ret.push_str(&exp.to_string());
            }
        }
    }
    let mut added_div = false;
    for (unit, exp) in pairs {
        if exp < 0 {
            if !added_div {
                added_div = true;
                if !ret.is_empty() {
                    ret.push('/');
                } else {
                    ret.push_str("1/");
                }
            }
            ret.push_str(unit);
            if exp != -1 {
                ret.push_str(&exp.abs().to_string());
            }
        }
    }
    ret
}

impl UnitDatabase {
    /// Obtains the shared simple quantity for a (unit, category) pair.
    ///
    /// Without a category, the unit's default category is used. The
    /// unit is validated against the category's quantity type.
    pub fn obtain_quantity(&self, unit: &str, category: Option<&str>) -> Result<Arc<Quantity>> {
        let category = match category {
            Some(category) => category.to_string(),
            None => self
                .default_category_of_unit(unit)
                .ok_or_else(|| UnitsError::InvalidUnit {
                    unit: unit.to_string(),
                    quantity_type: None,
                    category: None,
                    valid_units: Vec::new(),
                })?
                .to_string(),
        };
        self.check_category_unit(&category, unit)?;
        Ok(self.cached_quantity(vec![QuantityEntry::new(category, unit, 1)]))
    }

    /// Obtains the shared quantity for a category, in its default
    /// unit.
    pub fn obtain_category_quantity(&self, category: &str) -> Result<Arc<Quantity>> {
        let unit = self.default_unit(category)?.to_string();
        Ok(self.cached_quantity(vec![QuantityEntry::new(category, unit, 1)]))
    }

    /// Obtains the shared quantity for a set of category -> (unit,
    /// exponent) terms, validating every category and unit.
    ///
    /// Zero-exponent terms are dropped; no terms at all yields the
    /// empty quantity, and a single exponent-1 term collapses to the
    /// simple form.
    pub fn obtain_derived(
        &self,
        entries: impl IntoIterator<Item = QuantityEntry>,
    ) -> Result<Arc<Quantity>> {
        let entries: Vec<QuantityEntry> =
            entries.into_iter().filter(|e| e.exp != 0).collect();
        if entries.is_empty() {
            return Ok(Quantity::empty());
        }
        for entry in &entries {
            let quantity_type = self.category_quantity_type(&entry.category)?;
            self.check_quantity_type_unit(quantity_type, &entry.unit)?;
        }
        Ok(self.cached_quantity(entries))
    }

    /// Returns the shared instance for the given entries, inserting
    /// into the identity cache on first use. Racing insertions of the
    /// same content are idempotent: both callers end up with a live,
    /// structurally identical instance.
    pub(crate) fn cached_quantity(&self, entries: Vec<QuantityEntry>) -> Arc<Quantity> {
        if entries.is_empty() {
            return Quantity::empty();
        }
        let mut cache = self.quantities_cache.lock().unwrap();
        match cache.entry(entries) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let quantity = Arc::new(Quantity::from_entries(entry.key().clone()));
                entry.insert(quantity).clone()
            }
        }
    }
}
