//! Arithmetic between quantities.
//!
//! Sum and subtraction keep the quantity (after converting both sides
//! to shared units); multiplication and division compose a new derived
//! quantity by joining entries and adding or subtracting exponents.
//!
//! Before any operation the two sides are unified: when both carry the
//! same quantity type under different units, the later side is
//! converted to the unit seen first, values included. After that step
//! equal quantity types always mean equal units.

use std::sync::Arc;

use crate::convert::Value;
use crate::database::UnitDatabase;
use crate::error::{Result, UnitsError};
use crate::quantity::{Quantity, QuantityEntry};

impl UnitDatabase {
    /// Adds two values, converting the right side's units to the left
    /// side's where the quantity types match. Fails with
    /// [`UnitsError::IncompatibleQuantities`] when the unified units
    /// differ (a side without any unit takes the other side's
    /// quantity).
    pub fn sum(
        &self,
        quantity1: &Quantity,
        value1: &Value,
        quantity2: &Quantity,
        value2: &Value,
    ) -> Result<(Arc<Quantity>, Value)> {
        self.combine_same_quantity(quantity1, value1, quantity2, value2, |a, b| a + b)
    }

    /// Subtracts the second value from the first; unit handling as in
    /// [`UnitDatabase::sum`].
    pub fn subtract(
        &self,
        quantity1: &Quantity,
        value1: &Value,
        quantity2: &Quantity,
        value2: &Value,
    ) -> Result<(Arc<Quantity>, Value)> {
        self.combine_same_quantity(quantity1, value1, quantity2, value2, |a, b| a - b)
    }

    /// Multiplies two values, composing a derived quantity by adding
    /// the exponents of matching entries. Fully cancelled units yield
    /// the empty quantity.
    pub fn multiply(
        &self,
        quantity1: &Quantity,
        value1: &Value,
        quantity2: &Quantity,
        value2: &Value,
    ) -> Result<(Arc<Quantity>, Value)> {
        self.combine_new_quantity(quantity1, value1, quantity2, value2, |a, b| a + b, |a, b| a * b)
    }

    /// Divides the first value by the second, composing a derived
    /// quantity by subtracting the exponents of matching entries.
    pub fn divide(
        &self,
        quantity1: &Quantity,
        value1: &Value,
        quantity2: &Quantity,
        value2: &Value,
    ) -> Result<(Arc<Quantity>, Value)> {
        self.combine_new_quantity(quantity1, value1, quantity2, value2, |a, b| a - b, |a, b| a / b)
    }

    /// Operation that keeps the quantity (sum, subtraction).
    fn combine_same_quantity(
        &self,
        quantity1: &Quantity,
        value1: &Value,
        quantity2: &Quantity,
        value2: &Value,
        op: fn(f64, f64) -> f64,
    ) -> Result<(Arc<Quantity>, Value)> {
        if quantity1 == quantity2 {
            let result = apply_value_op(op, value1, value2)?;
            return Ok((self.cached_quantity(quantity1.entries().to_vec()), result));
        }

        let (entries1, entries2, value1, value2) =
            self.match_quantities(quantity1, quantity2, value1, value2)?;

        let matched1 = Quantity::from_entries(entries1);
        let matched2 = Quantity::from_entries(entries2);
        let mut joined1 = matched1.composing_units_joining_exponents();
        let mut joined2 = matched2.composing_units_joining_exponents();
        joined1.sort_unstable();
        joined2.sort_unstable();

        let result_quantity = if joined1 == joined2 {
            matched1
        } else if joined1.is_empty() {
            // No unit on the 1st side: just take the 2nd as the
            // correct one.
            matched2
        } else if joined2.is_empty() {
            matched1
        } else {
            return Err(UnitsError::IncompatibleQuantities {
                left: matched1.unit(),
                right: matched2.unit(),
            });
        };

        let result = apply_value_op(op, &value1, &value2)?;
        Ok((self.cached_quantity(result_quantity.entries().to_vec()), result))
    }

    /// Operation that composes a new quantity (multiplication,
    /// division).
    fn combine_new_quantity(
        &self,
        quantity1: &Quantity,
        value1: &Value,
        quantity2: &Quantity,
        value2: &Value,
        exp_op: fn(i32, i32) -> i32,
        op: fn(f64, f64) -> f64,
    ) -> Result<(Arc<Quantity>, Value)> {
        let (mut entries, entries2, value1, value2) =
            self.match_quantities(quantity1, quantity2, value1, value2)?;

        // Join the right side into the left; after matching, a shared
        // category always carries the same unit.
        for entry2 in entries2 {
            match entries.iter_mut().find(|e| e.category == entry2.category) {
                Some(entry) => entry.exp = exp_op(entry.exp, entry2.exp),
                None => {
                    let exp = exp_op(0, entry2.exp);
                    entries.push(QuantityEntry::new(entry2.category, entry2.unit, exp));
                }
            }
        }

        // Drop cancelled entries: zero exponents, and units whose
        // exponents cancel out across categories.
        let mut unit_totals: Vec<(&str, i32)> = Vec::new();
        for entry in &entries {
            match unit_totals.iter_mut().find(|(unit, _)| *unit == entry.unit) {
                Some((_, total)) => *total += entry.exp,
                None => unit_totals.push((&entry.unit, entry.exp)),
            }
        }
        let cancelled: Vec<String> = unit_totals
            .iter()
            .filter(|(_, total)| *total == 0)
            .map(|(unit, _)| unit.to_string())
            .collect();
        entries.retain(|e| e.exp != 0 && !cancelled.contains(&e.unit));

        let result_quantity = self.obtain_derived(entries)?;
        let result = apply_value_op(op, &value1, &value2)?;
        Ok((result_quantity, result))
    }

    /// Converts both sides so that every quantity type appearing on
    /// either side uses one unit: the one seen first, scanning the
    /// left side before the right. Values follow their side's unit
    /// changes.
    fn match_quantities(
        &self,
        quantity1: &Quantity,
        quantity2: &Quantity,
        value1: &Value,
        value2: &Value,
    ) -> Result<(Vec<QuantityEntry>, Vec<QuantityEntry>, Value, Value)> {
        let mut entries1 = quantity1.entries().to_vec();
        let mut entries2 = quantity2.entries().to_vec();
        let mut value1 = value1.clone();
        let mut value2 = value2.clone();
        let mut used_units: Vec<(String, String)> = Vec::new();
        self.unify_side(&mut entries1, &mut value1, &mut used_units)?;
        self.unify_side(&mut entries2, &mut value2, &mut used_units)?;
        Ok((entries1, entries2, value1, value2))
    }

    fn unify_side(
        &self,
        entries: &mut [QuantityEntry],
        value: &mut Value,
        used_units: &mut Vec<(String, String)>,
    ) -> Result<()> {
        for entry in entries.iter_mut() {
            let quantity_type = self.category_quantity_type(&entry.category)?.to_string();
            match used_units.iter().find(|(qt, _)| *qt == quantity_type) {
                None => used_units.push((quantity_type, entry.unit.clone())),
                Some((_, unit)) if *unit == entry.unit => {}
                Some((_, unit)) => {
                    let unit = unit.clone();
                    *value = self.convert_value(&quantity_type, &entry.unit, &unit, value)?;
                    entry.unit = unit;
                }
            }
        }
        Ok(())
    }
}

/// Applies a scalar operation element-wise, broadcasting scalars over
/// sequences. The container kind of the sequence side is kept; two
/// sequences must have the same length and kind.
fn apply_value_op(op: fn(f64, f64) -> f64, value1: &Value, value2: &Value) -> Result<Value> {
    let length_mismatch = |a: usize, b: usize| UnitsError::InvalidValueOperation {
        reason: format!("sequence lengths don't match: {a} != {b}"),
    };
    match (value1, value2) {
        (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(op(*a, *b))),
        (Value::Scalar(a), Value::Sequence(bs)) => {
            Ok(Value::Sequence(bs.iter().map(|b| op(*a, *b)).collect()))
        }
        (Value::Sequence(xs), Value::Scalar(b)) => {
            Ok(Value::Sequence(xs.iter().map(|a| op(*a, *b)).collect()))
        }
        (Value::Sequence(xs), Value::Sequence(ys)) => {
            if xs.len() != ys.len() {
                return Err(length_mismatch(xs.len(), ys.len()));
            }
            Ok(Value::Sequence(
                xs.iter().zip(ys).map(|(a, b)| op(*a, *b)).collect(),
            ))
        }
        (Value::Scalar(a), Value::FixedSequence(bs)) => Ok(Value::FixedSequence(
            bs.iter().map(|b| op(*a, *b)).collect(),
        )),
        (Value::FixedSequence(xs), Value::Scalar(b)) => Ok(Value::FixedSequence(
            xs.iter().map(|a| op(*a, *b)).collect(),
        )),
        (Value::FixedSequence(xs), Value::FixedSequence(ys)) => {
            if xs.len() != ys.len() {
                return Err(length_mismatch(xs.len(), ys.len()));
            }
            Ok(Value::FixedSequence(
                xs.iter().zip(ys.iter()).map(|(a, b)| op(*a, *b)).collect(),
            ))
        }
        (Value::Custom(custom), _) | (_, Value::Custom(custom)) => {
            Err(UnitsError::InvalidValueOperation {
                reason: format!(
                    "custom value '{}' does not support arithmetic",
                    custom.type_tag()
                ),
            })
        }
        (Value::Sequence(_), Value::FixedSequence(_))
        | (Value::FixedSequence(_), Value::Sequence(_)) => {
            Err(UnitsError::InvalidValueOperation {
                reason: "cannot mix growable and fixed sequences".to_string(),
            })
        }
    }
}
