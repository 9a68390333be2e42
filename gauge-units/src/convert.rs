//! Conversion of values between units, including exponentiated units
//! and custom value types.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::database::UnitDatabase;
use crate::error::{Result, UnitsError};
use crate::quantity::{Quantity, QuantityEntry};

/// Conversion routine registered for a custom value type, called as
/// `handler(db, quantity_type, from_unit, to_unit, value)`.
pub type ConversionHandler =
    Arc<dyn Fn(&UnitDatabase, &str, &str, &str, &CustomValue) -> Result<CustomValue> + Send + Sync>;

/// A value shape the conversion and arithmetic entry points accept.
///
/// This is a closed set on purpose: every conversion site can be
/// checked exhaustively, and the escape hatch for application-defined
/// payloads is [`Value::Custom`] with a registered
/// [`ConversionHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Sequence(Vec<f64>),
    /// A sequence whose length is fixed by construction; conversions
    /// preserve the container kind.
    FixedSequence(Box<[f64]>),
    Custom(CustomValue),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(x) => Some(*x),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::Sequence(values)
    }
}

/// An application-defined payload tagged with the type name its
/// conversion handler was registered under.
///
/// Equality is identity-based on the payload (two custom values are
/// equal when they share the same allocation and tag); the payload
/// itself is opaque to this crate.
#[derive(Clone)]
pub struct CustomValue {
    type_tag: String,
    payload: Arc<dyn Any + Send + Sync>,
}

impl CustomValue {
    pub fn new(type_tag: impl Into<String>, payload: Arc<dyn Any + Send + Sync>) -> Self {
        CustomValue {
            type_tag: type_tag.into(),
            payload,
        }
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn payload(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.payload
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValue")
            .field("type_tag", &self.type_tag)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_tag == other.type_tag && Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl UnitDatabase {
    /// Resolves a category name to its quantity type; a quantity type
    /// name passes through unchanged (after checking it exists).
    pub fn resolve_quantity_type<'a>(&'a self, category_or_quantity_type: &'a str) -> Result<&'a str> {
        match self.category_quantity_type(category_or_quantity_type) {
            Ok(quantity_type) => Ok(quantity_type),
            Err(_) => {
                self.check_quantity_type(category_or_quantity_type)?;
                Ok(category_or_quantity_type)
            }
        }
    }

    /// Converts a scalar from one unit to another. Both units must
    /// belong to the quantity type (the category's quantity type, when
    /// a category name is passed).
    pub fn convert(
        &self,
        category_or_quantity_type: &str,
        from_unit: &str,
        to_unit: &str,
        value: f64,
    ) -> Result<f64> {
        // Same unit: no conversion needed.
        if from_unit == to_unit {
            return Ok(value);
        }
        let quantity_type = self.resolve_quantity_type(category_or_quantity_type)?;
        let from_info = self.unit_info(quantity_type, from_unit)?;
        let to_info = self.unit_info(quantity_type, to_unit)?;
        Ok(to_info.from_base(from_info.to_base(value)))
    }

    /// Converts any supported value shape from one unit to another,
    /// preserving the container kind. Custom values are dispatched to
    /// the handler registered under their type tag.
    pub fn convert_value(
        &self,
        category_or_quantity_type: &str,
        from_unit: &str,
        to_unit: &str,
        value: &Value,
    ) -> Result<Value> {
        if from_unit == to_unit {
            return Ok(value.clone());
        }
        match value {
            Value::Scalar(x) => {
                Ok(Value::Scalar(self.convert(category_or_quantity_type, from_unit, to_unit, *x)?))
            }
            Value::Sequence(xs) => {
                let converted: Result<Vec<f64>> = xs
                    .iter()
                    .map(|x| self.convert(category_or_quantity_type, from_unit, to_unit, *x))
                    .collect();
                Ok(Value::Sequence(converted?))
            }
            Value::FixedSequence(xs) => {
                let converted: Result<Vec<f64>> = xs
                    .iter()
                    .map(|x| self.convert(category_or_quantity_type, from_unit, to_unit, *x))
                    .collect();
                Ok(Value::FixedSequence(converted?.into_boxed_slice()))
            }
            Value::Custom(custom) => {
                let handler = self
                    .conversion_handlers
                    .get(custom.type_tag())
                    .ok_or_else(|| UnitsError::NoConversionHandler {
                        type_tag: custom.type_tag().to_string(),
                    })?;
                let quantity_type = self.resolve_quantity_type(category_or_quantity_type)?;
                Ok(Value::Custom(handler(self, quantity_type, from_unit, to_unit, custom)?))
            }
        }
    }

    /// Converts a scalar between exponentiated units, e.g. 1 (m, 2) to
    /// 10000 (cm, 2).
    ///
    /// Both sides must carry the same non-zero exponent. For exponents
    /// other than 1 the value's e-th root is converted and the result
    /// raised back; the sign is carried around the root so negative
    /// values survive even exponents.
    pub fn convert_exp(
        &self,
        category_or_quantity_type: &str,
        from: (&str, i32),
        to: (&str, i32),
        value: f64,
    ) -> Result<f64> {
        let (from_unit, from_exp) = from;
        let (to_unit, to_exp) = to;
        if from == to {
            return Ok(value);
        }
        if from_exp != to_exp || from_exp == 0 {
            return Err(UnitsError::ExponentMismatch {
                from_unit: from_unit.to_string(),
                from_exp,
                to_unit: to_unit.to_string(),
                to_exp,
            });
        }
        if from_exp == 1 {
            return self.convert(category_or_quantity_type, from_unit, to_unit, value);
        }
        let negative = value < 0.0;
        let root = value.abs().powf(1.0 / f64::from(from_exp));
        let converted = self.convert(category_or_quantity_type, from_unit, to_unit, root)?;
        let ret = converted.powi(to_exp);
        Ok(if negative { -ret } else { ret })
    }

    /// Converts a scalar carried by composed quantity entries to a
    /// plain unit.
    ///
    /// No entries at all leave the value untouched; more than one
    /// entry cannot be decomposed into a unit-to-unit conversion and
    /// fails with [`UnitsError::ComposedConversion`]. The target unit
    /// carries exponent 1, so a single entry with a higher exponent
    /// fails with [`UnitsError::ExponentMismatch`].
    pub fn convert_composition(
        &self,
        entries: &[QuantityEntry],
        to_unit: &str,
        value: f64,
    ) -> Result<f64> {
        match entries {
            [] => Ok(value),
            [entry] => self.convert_exp(
                &entry.category,
                (&entry.unit, entry.exp),
                (to_unit, 1),
                value,
            ),
            _ => Err(UnitsError::ComposedConversion {
                unit: Quantity::from_entries(entries.to_vec()).unit(),
            }),
        }
    }

    /// Registers the conversion handler for a custom value type tag.
    ///
    /// Registering the same handler twice is a no-op; a different
    /// handler under an existing tag is rejected.
    pub fn register_conversion_handler(
        &mut self,
        type_tag: impl Into<String>,
        handler: ConversionHandler,
    ) -> Result<()> {
        let type_tag = type_tag.into();
        if let Some(existing) = self.conversion_handlers.get(&type_tag) {
            if Arc::ptr_eq(existing, &handler) {
                return Ok(());
            }
            return Err(UnitsError::DuplicateConversionHandler { type_tag });
        }
        debug!(type_tag = %type_tag, "conversion handler registered");
        self.conversion_handlers.insert(type_tag, handler);
        Ok(())
    }
}
