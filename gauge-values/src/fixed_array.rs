//! A fixed-length sequence of values sharing one quantity.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use gauge_units::{Quantity, Result, UnitDatabase, UnitsError, Value};

/// Like [`Array`](crate::Array) but with a length fixed at
/// construction: conversions and arithmetic always yield a
/// `FixedArray` of the same length, and mixing with a growable array
/// is rejected at the value level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedArray {
    quantity: Arc<Quantity>,
    values: Box<[f64]>,
}

impl FixedArray {
    pub fn new(
        db: &UnitDatabase,
        values: Box<[f64]>,
        unit: &str,
        category: Option<&str>,
    ) -> Result<Self> {
        let quantity = db.obtain_quantity(unit, category)?;
        Ok(FixedArray { quantity, values })
    }

    pub fn from_quantity(quantity: Arc<Quantity>, values: Box<[f64]>) -> Self {
        FixedArray { quantity, values }
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
    /// category.
    pub fn check_values(&self, db: &UnitDatabase) -> Result<()> {
        for value in self.values.iter() {
            self.quantity.check_value(db, *value)?;
        }
        Ok(())
    }

    pub fn values_in(&self, db: &UnitDatabase, unit: &str) -> Result<Vec<f64>> {
        self.values
            .iter()
            .map(|value| self.quantity.convert_scalar_value(db, *value, unit))
            .collect()
    }

    /// A copy of this array converted to another unit; the length is
    /// preserved.
    pub fn as_unit(&self, db: &UnitDatabase, unit: &str) -> Result<Self> {
        let values = self.values_in(db, unit)?.into_boxed_slice();
        let quantity = if self.quantity.is_derived() {
            db.obtain_quantity(unit, None)?
        } else {
            db.obtain_quantity(unit, Some(&self.quantity.category()))?
        };
        Ok(FixedArray { quantity, values })
    }

    pub fn add(&self, db: &UnitDatabase, other: &FixedArray) -> Result<Self> {
        self.combine(db, other, UnitDatabase::sum)
    }

    pub fn sub(&self, db: &UnitDatabase, other: &FixedArray) -> Result<Self> {
        self.combine(db, other, UnitDatabase::subtract)
    }

    pub fn mul(&self, db: &UnitDatabase, other: &FixedArray) -> Result<Self> {
        self.combine(db, other, UnitDatabase::multiply)
    }

    pub fn div(&self, db: &UnitDatabase, other: &FixedArray) -> Result<Self> {
        self.combine(db, other, UnitDatabase::divide)
    }

    fn combine(
        &self,
        db: &UnitDatabase,
        other: &FixedArray,
        op: fn(&UnitDatabase, &Quantity, &Value, &Quantity, &Value) -> Result<(Arc<Quantity>, Value)>,
    ) -> Result<Self> {
        let (quantity, value) = op(
            db,
            &self.quantity,
            &Value::FixedSequence(self.values.clone()),
            &other.quantity,
            &Value::FixedSequence(other.values.clone()),
        )?;
        match value {
            Value::FixedSequence(values) => Ok(FixedArray { quantity, values }),
            _ => Err(UnitsError::InvalidValueOperation {
                reason: "expected a fixed sequence result".to_string(),
            }),
        }
    }

    pub fn scale(&self, factor: f64) -> Self {
        FixedArray {
            quantity: self.quantity.clone(),
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }
}

impl fmt::Display for FixedArray {
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
