//! A growable sequence of values sharing one quantity.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use gauge_units::{Quantity, Result, UnitDatabase, UnitsError, Value};

use crate::scalar::Scalar;

/// An immutable sequence of values bound to a single quantity.
///
/// Element values are not range-checked at construction (sequences are
/// routinely staged before their category bounds apply); call
/// [`Array::check_values`] to enforce the category range explicitly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Array {
    quantity: Arc<Quantity>,
    values: Vec<f64>,
}

impl Array {
    pub fn new(
        db: &UnitDatabase,
        values: Vec<f64>,
        unit: &str,
        category: Option<&str>,
    ) -> Result<Self> {
        let quantity = db.obtain_quantity(unit, category)?;
        Ok(Array { quantity, values })
    }

    /// Creates an array for an already obtained quantity.
    pub fn from_quantity(quantity: Arc<Quantity>, values: Vec<f64>) -> Self {
        Array { quantity, values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
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

    /// Checks every element against the range of the quantity's
    /// category; fails on the first offending value.
    pub fn check_values(&self, db: &UnitDatabase) -> Result<()> {
        for value in &self.values {
            self.quantity.check_value(db, *value)?;
        }
        Ok(())
    }

    /// The values converted to another unit, without touching this
    /// array.
    pub fn values_in(&self, db: &UnitDatabase, unit: &str) -> Result<Vec<f64>> {
        self.values
            .iter()
            .map(|value| self.quantity.convert_scalar_value(db, *value, unit))
            .collect()
    }

    /// A copy of this array converted to another unit.
    pub fn as_unit(&self, db: &UnitDatabase, unit: &str) -> Result<Self> {
        let values = self.values_in(db, unit)?;
        let quantity = if self.quantity.is_derived() {
            db.obtain_quantity(unit, None)?
        } else {
            db.obtain_quantity(unit, Some(&self.quantity.category()))?
        };
        Ok(Array { quantity, values })
    }

    pub fn add(&self, db: &UnitDatabase, other: &Array) -> Result<Self> {
        let (quantity, value) = db.sum(
            &self.quantity,
            &Value::Sequence(self.values.clone()),
            &other.quantity,
            &Value::Sequence(other.values.clone()),
        )?;
        Ok(Array { quantity, values: sequence_of(value)? })
    }

    pub fn sub(&self, db: &UnitDatabase, other: &Array) -> Result<Self> {
        let (quantity, value) = db.subtract(
            &self.quantity,
            &Value::Sequence(self.values.clone()),
            &other.quantity,
            &Value::Sequence(other.values.clone()),
        )?;
        Ok(Array { quantity, values: sequence_of(value)? })
    }

    pub fn mul(&self, db: &UnitDatabase, other: &Array) -> Result<Self> {
        let (quantity, value) = db.multiply(
            &self.quantity,
            &Value::Sequence(self.values.clone()),
            &other.quantity,
            &Value::Sequence(other.values.clone()),
        )?;
        Ok(Array { quantity, values: sequence_of(value)? })
    }

    pub fn div(&self, db: &UnitDatabase, other: &Array) -> Result<Self> {
        let (quantity, value) = db.divide(
            &self.quantity,
            &Value::Sequence(self.values.clone()),
            &other.quantity,
            &Value::Sequence(other.values.clone()),
        )?;
        Ok(Array { quantity, values: sequence_of(value)? })
    }

    /// Element-wise arithmetic against a scalar, converting the
    /// scalar's unit as needed.
    pub fn add_scalar(&self, db: &UnitDatabase, scalar: &Scalar) -> Result<Self> {
        let (quantity, value) = db.sum(
            &self.quantity,
            &Value::Sequence(self.values.clone()),
            scalar.quantity(),
            &Value::Scalar(scalar.value()),
        )?;
        Ok(Array { quantity, values: sequence_of(value)? })
    }

    /// Multiplies every element by a bare number; the quantity is
    /// unchanged.
    pub fn scale(&self, factor: f64) -> Self {
        Array {
            quantity: self.quantity.clone(),
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }
}

fn sequence_of(value: Value) -> Result<Vec<f64>> {
    match value {
        Value::Sequence(values) => Ok(values),
        _ => Err(UnitsError::InvalidValueOperation {
            reason: "expected a sequence result".to_string(),
        }),
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted: Vec<String> = self.values.iter().map(f64::to_string).collect();
        let unit = self.quantity.unit();
        if unit.is_empty() {
            write!(f, "[{}]", formatted.join(", "))
        } else {
            write!(f, "[{}] [{unit}]", formatted.join(", "))
        }
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
    fn test_new_and_conversion() {
        let db = simple_db();
        let a = Array::new(&db, vec![1.0, 2.0, 3.0], "m", None).unwrap();
        assert_eq!(a.values_in(&db, "cm").unwrap(), vec![100.0, 200.0, 300.0]);
        // The original is untouched.
        assert_eq!(a.values(), &[1.0, 2.0, 3.0]);
        let cm = a.as_unit(&db, "cm").unwrap();
        assert_eq!(cm.unit(), "cm");
        assert_eq!(cm.values(), &[100.0, 200.0, 300.0]);
    }

    #[test]
    fn test_check_values() {
        let mut db = UnitDatabase::new();
        fill_defaults(&mut db).unwrap();
        db.add_category(
            CategorySpec::new("pipe pressure", "pressure").min_value(0.0).max_value(10000.0),
            false,
        )
        .unwrap();
        let ok = Array::new(&db, vec![0.0, 10000.0], "Pa", Some("pipe pressure")).unwrap();
        ok.check_values(&db).unwrap();
        // Creation does not check; the explicit call does.
        let bad = Array::new(&db, vec![1.0, -1.0], "Pa", Some("pipe pressure")).unwrap();
        let err = bad.check_values(&db).unwrap_err();
        assert!(matches!(err, UnitsError::ValueOutOfRange { .. }));
    }

    #[test]
    fn test_add_converts_units() {
        let db = simple_db();
        let a = Array::new(&db, vec![1.0, 2.0], "m", None).unwrap();
        let b = Array::new(&db, vec![100.0, 200.0], "cm", None).unwrap();
        let sum = a.add(&db, &b).unwrap();
        assert_eq!(sum.unit(), "m");
        assert_eq!(sum.values(), &[2.0, 4.0]);
    }

    #[test]
    fn test_length_mismatch() {
        let db = simple_db();
        let a = Array::new(&db, vec![1.0, 2.0], "m", None).unwrap();
        let b = Array::new(&db, vec![1.0], "m", None).unwrap();
        let err = a.add(&db, &b).unwrap_err();
        assert!(matches!(err, UnitsError::InvalidValueOperation { .. }));
    }

    #[test]
    fn test_div_derives_rates() {
        let db = simple_db();
        let distance = Array::new(&db, vec![10.0, 20.0], "m", None).unwrap();
        let elapsed = Array::new(&db, vec![2.0, 4.0], "s", None).unwrap();
        let speed = distance.div(&db, &elapsed).unwrap();
        assert_eq!(speed.unit(), "m/s");
        assert_eq!(speed.values(), &[5.0, 5.0]);
    }

    #[test]
    fn test_add_scalar_broadcast() {
        let db = simple_db();
        let a = Array::new(&db, vec![1.0, 2.0], "m", None).unwrap();
        let offset = Scalar::new(&db, 50.0, "cm", None).unwrap();
        let shifted = a.add_scalar(&db, &offset).unwrap();
        assert_eq!(shifted.values(), &[1.5, 2.5]);
        assert_eq!(shifted.unit(), "m");
    }

    #[test]
    fn test_scale_and_display() {
        let db = simple_db();
        let a = Array::new(&db, vec![1.0, 2.0], "m", None).unwrap();
        assert_eq!(a.scale(10.0).values(), &[10.0, 20.0]);
        assert_eq!(a.to_string(), "[1, 2] [m]");
    }
}
