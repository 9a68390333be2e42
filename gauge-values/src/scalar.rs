//! A single unit-aware value.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use gauge_units::{Quantity, Result, UnitDatabase, UnitsError, Value};

/// An immutable scalar bound to a quantity.
///
/// Every constructor validates the value against the range of the
/// quantity's category. Conversions and arithmetic return new
/// scalars; an existing scalar never changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scalar {
    quantity: Arc<Quantity>,
    value: f64,
}

impl Scalar {
    /// Creates a scalar with the given unit (and category, when the
    /// unit's default category is not the intended one).
    pub fn new(db: &UnitDatabase, value: f64, unit: &str, category: Option<&str>) -> Result<Self> {
        let quantity = db.obtain_quantity(unit, category)?;
        quantity.check_value(db, value)?;
        Ok(Scalar { quantity, value })
    }

    /// Creates a scalar carrying the category's default unit and
    /// default value.
    pub fn from_category(db: &UnitDatabase, category: &str) -> Result<Self> {
        let quantity = db.obtain_category_quantity(category)?;
        let value = db.default_value(category)?;
        Ok(Scalar { quantity, value })
    }

    /// Creates a scalar for an already obtained quantity.
    pub fn from_quantity(db: &UnitDatabase, quantity: Arc<Quantity>, value: f64) -> Result<Self> {
        quantity.check_value(db, value)?;
        Ok(Scalar { quantity, value })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn quantity(&self) -> &Arc<Quantity> {
        &self.quantity
    }

    pub fn unit(&self) -> String {
        self.quantity.unit()
    }

    pub fn category(&self) -> String {
        self.quantity.category()
    }

    /// The value converted to another unit, without touching this
    /// scalar.
    pub fn value_in(&self, db: &UnitDatabase, unit: &str) -> Result<f64> {
        self.quantity.convert_scalar_value(db, self.value, unit)
    }

    /// A copy of this scalar converted to another unit.
    pub fn as_unit(&self, db: &UnitDatabase, unit: &str) -> Result<Self> {
        let value = self.value_in(db, unit)?;
        let quantity = if self.quantity.is_derived() {
            db.obtain_quantity(unit, None)?
        } else {
            db.obtain_quantity(unit, Some(&self.quantity.category()))?
        };
        Ok(Scalar { quantity, value })
    }

    pub fn add(&self, db: &UnitDatabase, other: &Scalar) -> Result<Self> {
        let (quantity, value) = db.sum(
            &self.quantity,
            &Value::Scalar(self.value),
            &other.quantity,
            &Value::Scalar(other.value),
        )?;
        Ok(Scalar { quantity, value: scalar_of(value)? })
    }

    pub fn sub(&self, db: &UnitDatabase, other: &Scalar) -> Result<Self> {
        let (quantity, value) = db.subtract(
            &self.quantity,
            &Value::Scalar(self.value),
            &other.quantity,
            &Value::Scalar(other.value),
        )?;
        Ok(Scalar { quantity, value: scalar_of(value)? })
    }

    pub fn mul(&self, db: &UnitDatabase, other: &Scalar) -> Result<Self> {
        let (quantity, value) = db.multiply(
            &self.quantity,
            &Value::Scalar(self.value),
            &other.quantity,
            &Value::Scalar(other.value),
        )?;
        Ok(Scalar { quantity, value: scalar_of(value)? })
    }

    pub fn div(&self, db: &UnitDatabase, other: &Scalar) -> Result<Self> {
        let (quantity, value) = db.divide(
            &self.quantity,
            &Value::Scalar(self.value),
            &other.quantity,
            &Value::Scalar(other.value),
        )?;
        Ok(Scalar { quantity, value: scalar_of(value)? })
    }

    /// Multiplies by a bare number; the quantity is unchanged, so no
    /// database is needed.
    pub fn scale(&self, factor: f64) -> Self {
        Scalar {
            quantity: self.quantity.clone(),
            value: self.value * factor,
        }
    }
}

pub(crate) fn scalar_of(value: Value) -> Result<f64> {
    value
        .as_scalar()
        .ok_or_else(|| UnitsError::InvalidValueOperation {
            reason: "expected a scalar result".to_string(),
        })
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.quantity.unit();
        if unit.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} [{unit}]", self.value)
        }
    }
}

impl PartialOrd for Scalar {
    /// Only scalars of the same quantity are ordered; comparing
    /// across quantities yields `None` rather than a silent unit mixup.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.quantity != other.quantity {
            return None;
        }
        self.value.partial_cmp(&other.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_units::bootstrap::{fill_defaults, fill_simple};
    use gauge_units::CategorySpec;

    fn simple_db() -> UnitDatabase {
        let mut db = UnitDatabase::new();
        fill_simple(&mut db).unwrap();
        db
    }

    #[test]
    fn test_new_and_accessors() {
        let db = simple_db();
        let s = Scalar::new(&db, 2.5, "m", None).unwrap();
        assert_eq!(s.value(), 2.5);
        assert_eq!(s.unit(), "m");
        assert_eq!(s.category(), "length");
    }

    #[test]
    fn test_from_category_defaults() {
        let mut db = simple_db();
        db.add_category(
            CategorySpec::new("depth", "length").default_unit("cm").default_value(10.0),
            false,
        )
        .unwrap();
        let s = Scalar::from_category(&db, "depth").unwrap();
        assert_eq!(s.unit(), "cm");
        assert_eq!(s.value(), 10.0);
    }

    #[test]
    fn test_range_enforced_at_creation() {
        let mut db = UnitDatabase::new();
        fill_defaults(&mut db).unwrap();
        db.add_category(
            CategorySpec::new("pipe pressure", "pressure").min_value(0.0).max_value(10000.0),
            false,
        )
        .unwrap();
        Scalar::new(&db, 0.0, "Pa", Some("pipe pressure")).unwrap();
        Scalar::new(&db, 10000.0, "Pa", Some("pipe pressure")).unwrap();
        let err = Scalar::new(&db, -1.0, "Pa", Some("pipe pressure")).unwrap_err();
        assert!(matches!(err, UnitsError::ValueOutOfRange { .. }));
        // The bound applies in the default unit: 11 kPa is 11000 Pa.
        let err = Scalar::new(&db, 11.0, "kPa", Some("pipe pressure")).unwrap_err();
        assert!(matches!(err, UnitsError::ValueOutOfRange { .. }));
    }

    #[test]
    fn test_value_in_does_not_mutate() {
        let db = simple_db();
        let s = Scalar::new(&db, 1.0, "m", None).unwrap();
        assert_eq!(s.value_in(&db, "cm").unwrap(), 100.0);
        assert_eq!(s.value(), 1.0);
        assert_eq!(s.unit(), "m");
    }

    #[test]
    fn test_as_unit_returns_converted_copy() {
        let db = simple_db();
        let s = Scalar::new(&db, 1.0, "m", None).unwrap();
        let cm = s.as_unit(&db, "cm").unwrap();
        assert_eq!(cm.value(), 100.0);
        assert_eq!(cm.unit(), "cm");
        assert_eq!(cm.category(), "length");
        assert_eq!(s.unit(), "m");
    }

    #[test]
    fn test_add_converts_units() {
        let db = simple_db();
        let a = Scalar::new(&db, 1.0, "m", None).unwrap();
        let b = Scalar::new(&db, 50.0, "cm", None).unwrap();
        let sum = a.add(&db, &b).unwrap();
        assert_eq!(sum.unit(), "m");
        assert_eq!(sum.value(), 1.5);
    }

    #[test]
    fn test_add_incompatible() {
        let db = simple_db();
        let a = Scalar::new(&db, 1.0, "m", None).unwrap();
        let b = Scalar::new(&db, 1.0, "s", None).unwrap();
        let err = a.add(&db, &b).unwrap_err();
        assert!(matches!(err, UnitsError::IncompatibleQuantities { .. }));
    }

    #[test]
    fn test_mul_derives_quantity() {
        let db = simple_db();
        let a = Scalar::new(&db, 3.0, "m", None).unwrap();
        let b = Scalar::new(&db, 4.0, "m", None).unwrap();
        let area = a.mul(&db, &b).unwrap();
        assert_eq!(area.unit(), "m2");
        assert_eq!(area.value(), 12.0);
        let volume = area.mul(&db, &b).unwrap();
        assert_eq!(volume.unit(), "m3");
        assert_eq!(volume.value(), 48.0);
    }

    #[test]
    fn test_div_cancels_to_bare_number() {
        let db = simple_db();
        let a = Scalar::new(&db, 1.0, "m", None).unwrap();
        let b = Scalar::new(&db, 50.0, "cm", None).unwrap();
        let ratio = a.div(&db, &b).unwrap();
        assert!(ratio.quantity().is_empty());
        assert_eq!(ratio.value(), 2.0);
        assert_eq!(ratio.to_string(), "2");
    }

    #[test]
    fn test_scale() {
        let db = simple_db();
        let s = Scalar::new(&db, 2.0, "m", None).unwrap();
        let doubled = s.scale(2.0);
        assert_eq!(doubled.value(), 4.0);
        assert_eq!(doubled.unit(), "m");
        assert!(Arc::ptr_eq(doubled.quantity(), s.quantity()));
    }

    #[test]
    fn test_ordering_within_one_quantity() {
        let db = simple_db();
        let a = Scalar::new(&db, 1.0, "m", None).unwrap();
        let b = Scalar::new(&db, 2.0, "m", None).unwrap();
        assert!(a < b);
        let s = Scalar::new(&db, 0.5, "s", None).unwrap();
        assert_eq!(a.partial_cmp(&s), None);
        // Same category, different unit: not ordered either; convert
        // first.
        let cm = Scalar::new(&db, 200.0, "cm", None).unwrap();
        assert_eq!(a.partial_cmp(&cm), None);
        assert!(a < cm.as_unit(&db, "m").unwrap());
    }

    #[test]
    fn test_serialization() {
        let db = simple_db();
        let s = Scalar::new(&db, 2.5, "m", None).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["value"], 2.5);
        assert_eq!(json["quantity"]["entries"][0]["category"], "length");
        assert_eq!(json["quantity"]["entries"][0]["unit"], "m");
        assert_eq!(json["quantity"]["entries"][0]["exp"], 1);

        let a = Scalar::new(&db, 3.0, "m", None).unwrap();
        let area = s.mul(&db, &a).unwrap();
        let json = serde_json::to_value(&area).unwrap();
        assert_eq!(json["quantity"]["entries"][0]["exp"], 2);
    }

    #[test]
    fn test_display() {
        let db = simple_db();
        let s = Scalar::new(&db, 2.5, "m", None).unwrap();
        assert_eq!(s.to_string(), "2.5 [m]");
    }
}
