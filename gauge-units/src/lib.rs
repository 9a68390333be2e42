//! Gauge Units - Quantity Algebra and Unit Conversion
//!
//! Provides a runtime unit database with quantity types, units and
//! application-level categories, plus the quantity algebra on top:
//! conversion (including exponentiated and composed units) and
//! arithmetic that derives result quantities (m * m -> m2,
//! m / s -> m/s).
//!
//! The database is an explicit handle: fill it once during bootstrap
//! with `&mut` calls, then share `&UnitDatabase` everywhere. Obtained
//! quantities are immutable and cached, so structurally equal
//! quantities share one allocation.
//!
//! ```
//! use gauge_units::{bootstrap, UnitDatabase, Value};
//!
//! let mut db = UnitDatabase::new();
//! bootstrap::fill_simple(&mut db).unwrap();
//!
//! assert_eq!(db.convert("length", "m", "cm", 1.0).unwrap(), 100.0);
//!
//! let m = db.obtain_quantity("m", Some("length")).unwrap();
//! let (area, value) = db
//!     .multiply(&m, &Value::Scalar(3.0), &m, &Value::Scalar(4.0))
//!     .unwrap();
//! assert_eq!(area.unit(), "m2");
//! assert_eq!(value, Value::Scalar(12.0));
//! ```

pub mod bootstrap;
mod category;
mod convert;
mod database;
mod error;
mod ops;
mod quantity;
mod unit;

pub use category::{CategoryInfo, CategorySpec};
pub use convert::{ConversionHandler, CustomValue, Value};
pub use database::UnitDatabase;
pub use error::{Result, UnitsError};
pub use quantity::{Composition, Quantity, QuantityEntry, UnitComposition};
pub use unit::{ConversionFn, UnitInfo};
