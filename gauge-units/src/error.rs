//! Errors raised by the unit database and the quantity algebra.
//!
//! Everything here is detected synchronously and never retried:
//! registration errors mean the bootstrap data is wrong (fatal at
//! startup), while conversion and arithmetic errors are meant to be
//! caught and shown to the end user ("cannot add a length to a time").

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, UnitsError>;

/// Error type for all unit, category and quantity operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UnitsError {
    /// A quantity type that is not registered in the database.
    #[error("{}", invalid_quantity_type_msg(.quantity_type, .available))]
    InvalidQuantityType {
        quantity_type: String,
        /// Registered quantity types, sorted, so callers can build
        /// actionable messages.
        available: Vec<String>,
    },

    /// A unit that is not registered, or not registered under the
    /// quantity type / category it was looked up through.
    #[error("{}", invalid_unit_msg(.unit, .quantity_type, .category, .valid_units))]
    InvalidUnit {
        unit: String,
        quantity_type: Option<String>,
        category: Option<String>,
        valid_units: Vec<String>,
    },

    /// Unit symbols are global: the same symbol cannot be registered
    /// twice, not even under a different quantity type.
    #[error(
        "unit '{unit}' already added to the unit database for quantity type \
         '{existing_quantity_type}' (trying to add to '{quantity_type}')"
    )]
    DuplicateUnit {
        unit: String,
        existing_quantity_type: String,
        quantity_type: String,
    },

    /// A quantity type can only have one base unit.
    #[error(
        "quantity type '{quantity_type}' already has the base unit \
         '{base_unit}' (trying to add '{unit}')"
    )]
    DuplicateBaseUnit {
        quantity_type: String,
        base_unit: String,
        unit: String,
    },

    /// Category registered twice without the overwrite flag.
    #[error("category '{category}' already registered")]
    CategoryAlreadyRegistered { category: String },

    /// The category definition itself is inconsistent (bad bounds,
    /// default value outside the bounds, valid-unit subset containing
    /// foreign units, ...).
    #[error("error while adding category '{category}': {reason}")]
    InvalidCategorySpec { category: String, reason: String },

    /// A value violates the min/max bounds of its category.
    #[error("invalid value for {caption}: {value}. Must be {comparison} {limit}.")]
    ValueOutOfRange {
        caption: String,
        value: f64,
        comparison: &'static str,
        limit: f64,
    },

    /// Exponentiated conversion where the two sides do not carry the
    /// same (non-zero) exponent.
    #[error(
        "cannot convert between different exponents: \
         ('{from_unit}', {from_exp}) to ('{to_unit}', {to_exp})"
    )]
    ExponentMismatch {
        from_unit: String,
        from_exp: i32,
        to_unit: String,
        to_exp: i32,
    },

    /// Arithmetic between quantities whose units do not match after
    /// unification. E.g. meters + seconds (meters + centimeters is
    /// fine).
    #[error("cannot operate on quantities, units don't match: ({left} != {right})")]
    IncompatibleQuantities { left: String, right: String },

    /// Conversion of a multi-term composed unit, which cannot be
    /// decomposed into a single unit-to-unit conversion.
    #[error("can only convert one unit to another, not the composed unit '{unit}'")]
    ComposedConversion { unit: String },

    /// A custom value whose type tag has no registered conversion
    /// handler.
    #[error("no conversion handler registered for type tag '{type_tag}'")]
    NoConversionHandler { type_tag: String },

    /// A second, different handler registered under an existing tag.
    #[error("type tag '{type_tag}' already has a conversion handler registered")]
    DuplicateConversionHandler { type_tag: String },

    /// Value-level arithmetic that cannot be carried out, e.g. two
    /// sequences of different lengths or a custom value in an
    /// arithmetic operation.
    #[error("invalid value operation: {reason}")]
    InvalidValueOperation { reason: String },
}

fn invalid_quantity_type_msg(quantity_type: &str, available: &[String]) -> String {
    if available.is_empty() {
        format!("invalid quantity type: {quantity_type}")
    } else {
        format!(
            "invalid quantity type: {quantity_type}\navailable:\n{}",
            available.join("\n")
        )
    }
}

fn invalid_unit_msg(
    unit: &str,
    quantity_type: &Option<String>,
    category: &Option<String>,
    valid_units: &[String],
) -> String {
    let mut msg = if let Some(quantity_type) = quantity_type {
        format!("invalid unit for quantity type {quantity_type}: {unit}")
    } else if let Some(category) = category {
        format!("invalid unit for category {category}: {unit}")
    } else {
        format!("invalid unit: {unit}")
    };
    if !valid_units.is_empty() {
        msg.push_str(&format!(" [valid units: {}]", valid_units.join(", ")));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_unit_message_with_quantity_type() {
        let err = UnitsError::InvalidUnit {
            unit: "foo".to_string(),
            quantity_type: Some("length".to_string()),
            category: None,
            valid_units: vec!["m".to_string(), "cm".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "invalid unit for quantity type length: foo [valid units: m, cm]"
        );
    }

    #[test]
    fn test_invalid_unit_message_with_category() {
        let err = UnitsError::InvalidUnit {
            unit: "s".to_string(),
            quantity_type: None,
            category: Some("depth".to_string()),
            valid_units: vec![],
        };
        assert_eq!(err.to_string(), "invalid unit for category depth: s");
    }

    #[test]
    fn test_out_of_range_message() {
        let err = UnitsError::ValueOutOfRange {
            caption: "Pressure".to_string(),
            value: -1.0,
            comparison: ">=",
            limit: 0.0,
        };
        assert_eq!(err.to_string(), "invalid value for Pressure: -1. Must be >= 0.");
    }

    #[test]
    fn test_invalid_quantity_type_lists_available() {
        let err = UnitsError::InvalidQuantityType {
            quantity_type: "speed".to_string(),
            available: vec!["length".to_string(), "time".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid quantity type: speed"));
        assert!(msg.contains("length"));
        assert!(msg.contains("time"));
    }
}
