//! Gauge Values - Unit-Aware Value Containers
//!
//! Scalars, growable arrays and fixed-length arrays that carry their
//! quantity alongside the numbers. All containers are immutable:
//! conversions and arithmetic hand back new containers and never touch
//! the originals.
//!
//! ```
//! use gauge_units::{bootstrap, UnitDatabase};
//! use gauge_values::Scalar;
//!
//! let mut db = UnitDatabase::new();
//! bootstrap::fill_simple(&mut db).unwrap();
//!
//! let width = Scalar::new(&db, 3.0, "m", None).unwrap();
//! let height = Scalar::new(&db, 400.0, "cm", None).unwrap();
//! let area = width.mul(&db, &height).unwrap();
//! assert_eq!(area.unit(), "m2");
//! assert_eq!(area.value(), 12.0);
//! ```

mod array;
mod fixed_array;
mod scalar;

pub use array::Array;
pub use fixed_array::FixedArray;
pub use scalar::Scalar;
