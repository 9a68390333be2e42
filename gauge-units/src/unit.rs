//! Unit definitions with their conversion functions.

use std::fmt;
use std::sync::Arc;

/// Unary numeric conversion applied between a unit and the base unit
/// of its quantity type.
pub type ConversionFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Holds information about a registered unit.
///
/// The `to_base`/`from_base` pair describes the unit's distance from
/// the base unit of its quantity type: `to_base` maps a value in this
/// unit to the base unit, `from_base` maps a base-unit value back.
/// `from_base(to_base(x))` is expected to round-trip within floating
/// tolerance for every valid `x`; this is not enforced at registration
/// time, only by tests.
///
/// Created once at registration, immutable afterwards, owned by the
/// [`UnitDatabase`](crate::UnitDatabase).
#[derive(Clone)]
pub struct UnitInfo {
    /// Quantity type this unit belongs to (e.g. "length").
    pub quantity_type: String,
    /// User-friendly name (e.g. "meter", "millimeter").
    pub name: String,
    /// The unit symbol (e.g. "m", "mm"). Globally unique.
    pub unit: String,
    /// Default category for this unit, if any.
    pub default_category: Option<String>,
    to_base: ConversionFn,
    from_base: ConversionFn,
    has_conversion: bool,
}

impl UnitInfo {
    /// Creates a unit with the given conversion pair.
    pub fn new(
        quantity_type: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        to_base: ConversionFn,
        from_base: ConversionFn,
        default_category: Option<String>,
    ) -> Self {
        UnitInfo {
            quantity_type: quantity_type.into(),
            name: name.into(),
            unit: unit.into(),
            default_category,
            to_base,
            from_base,
            has_conversion: true,
        }
    }

    /// Creates a base unit: both conversion functions are the
    /// identity.
    pub fn identity(
        quantity_type: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        UnitInfo {
            quantity_type: quantity_type.into(),
            name: name.into(),
            unit: unit.into(),
            default_category: None,
            to_base: Arc::new(|x| x),
            from_base: Arc::new(|x| x),
            has_conversion: false,
        }
    }

    /// Converts a value in this unit to the base unit.
    pub fn to_base(&self, value: f64) -> f64 {
        (self.to_base)(value)
    }

    /// Converts a base-unit value to this unit.
    pub fn from_base(&self, value: f64) -> f64 {
        (self.from_base)(value)
    }

    /// Whether this unit actually converts, i.e. is not the base unit
    /// of its quantity type.
    pub fn has_conversion(&self) -> bool {
        self.has_conversion
    }
}

impl fmt::Debug for UnitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitInfo")
            .field("quantity_type", &self.quantity_type)
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("default_category", &self.default_category)
            .field("has_conversion", &self.has_conversion)
            .finish()
    }
}

impl fmt::Display for UnitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.unit)
    }
}

impl PartialEq for UnitInfo {
    fn eq(&self, other: &Self) -> bool {
        // Symbols are globally unique, so they identify the unit.
        self.unit == other.unit
    }
}

impl Eq for UnitInfo {}
