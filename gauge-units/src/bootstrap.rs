//! Canned unit databases.
//!
//! [`fill_simple`] registers the minimal length/time set used all over
//! the test suites; [`fill_defaults`] adds the common physical
//! quantity types an application usually starts from. Both leave the
//! database open for further `add_unit`/`add_category` calls.

use std::sync::Arc;

use tracing::debug;

use crate::category::CategorySpec;
use crate::database::UnitDatabase;
use crate::error::Result;
use crate::unit::ConversionFn;

/// Conversion pair for a unit that is a constant factor away from the
/// base unit: `1 unit == factor base units`.
fn linear(factor: f64) -> (ConversionFn, ConversionFn) {
    (
        Arc::new(move |x| x * factor),
        Arc::new(move |x| x / factor),
    )
}

/// Fills a database with a small length/time set: m, mm, cm, km and
/// s, min, h, d, with one category per quantity type.
pub fn fill_simple(db: &mut UnitDatabase) -> Result<()> {
    fill_length(db)?;
    fill_time(db)?;
    debug!("simple unit database filled");
    Ok(())
}

/// Fills a database with the common physical quantity types: the
/// simple set plus mass, temperature, pressure, volume and velocity.
pub fn fill_defaults(db: &mut UnitDatabase) -> Result<()> {
    fill_simple(db)?;
    fill_mass(db)?;
    fill_temperature(db)?;
    fill_pressure(db)?;
    fill_volume(db)?;
    fill_velocity(db)?;
    debug!("default unit database filled");
    Ok(())
}

fn fill_length(db: &mut UnitDatabase) -> Result<()> {
    db.add_base_unit("length", "meters", "m")?;
    let (to, from) = linear(0.001);
    db.add_unit("length", "millimeters", "mm", to, from, None)?;
    let (to, from) = linear(0.01);
    db.add_unit("length", "centimeters", "cm", to, from, None)?;
    let (to, from) = linear(1000.0);
    db.add_unit("length", "kilometers", "km", to, from, None)?;
    db.add_category(CategorySpec::new("length", "length"), false)?;
    Ok(())
}

fn fill_time(db: &mut UnitDatabase) -> Result<()> {
    db.add_base_unit("time", "seconds", "s")?;
    let (to, from) = linear(60.0);
    db.add_unit("time", "minutes", "min", to, from, None)?;
    let (to, from) = linear(3600.0);
    db.add_unit("time", "hours", "h", to, from, None)?;
    let (to, from) = linear(86400.0);
    db.add_unit("time", "days", "d", to, from, None)?;
    db.add_category(CategorySpec::new("time", "time"), false)?;
    Ok(())
}

fn fill_mass(db: &mut UnitDatabase) -> Result<()> {
    db.add_base_unit("mass", "kilograms", "kg")?;
    let (to, from) = linear(0.001);
    db.add_unit("mass", "grams", "g", to, from, None)?;
    let (to, from) = linear(0.453_592_37);
    db.add_unit("mass", "pounds", "lb", to, from, None)?;
    db.add_category(CategorySpec::new("mass", "mass"), false)?;
    Ok(())
}

fn fill_temperature(db: &mut UnitDatabase) -> Result<()> {
    db.add_base_unit("temperature", "kelvin", "K")?;
    // Affine conversions: the factor helper does not apply.
    db.add_unit(
        "temperature",
        "degrees Celsius",
        "degC",
        Arc::new(|x| x + 273.15),
        Arc::new(|x| x - 273.15),
        None,
    )?;
    db.add_unit(
        "temperature",
        "degrees Fahrenheit",
        "degF",
        Arc::new(|x| (x - 32.0) * 5.0 / 9.0 + 273.15),
        Arc::new(|x| (x - 273.15) * 9.0 / 5.0 + 32.0),
        None,
    )?;
    db.add_category(CategorySpec::new("temperature", "temperature"), false)?;
    Ok(())
}

fn fill_pressure(db: &mut UnitDatabase) -> Result<()> {
    db.add_base_unit("pressure", "pascals", "Pa")?;
    let (to, from) = linear(1000.0);
    db.add_unit("pressure", "kilopascals", "kPa", to, from, None)?;
    let (to, from) = linear(100_000.0);
    db.add_unit("pressure", "bars", "bar", to, from, None)?;
    let (to, from) = linear(6_894.757_293_168_361);
    db.add_unit("pressure", "pounds per square inch", "psi", to, from, None)?;
    let (to, from) = linear(101_325.0);
    db.add_unit("pressure", "atmospheres", "atm", to, from, None)?;
    db.add_category(CategorySpec::new("pressure", "pressure"), false)?;
    Ok(())
}

fn fill_volume(db: &mut UnitDatabase) -> Result<()> {
    db.add_base_unit("volume", "cubic meters", "m3")?;
    let (to, from) = linear(0.001);
    db.add_unit("volume", "liters", "L", to, from, None)?;
    db.add_category(CategorySpec::new("volume", "volume"), false)?;
    Ok(())
}

fn fill_velocity(db: &mut UnitDatabase) -> Result<()> {
    db.add_base_unit("velocity", "meters per second", "m/s")?;
    let (to, from) = linear(1.0 / 3.6);
    db.add_unit("velocity", "kilometers per hour", "km/h", to, from, None)?;
    db.add_category(CategorySpec::new("velocity", "velocity"), false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_simple_conversions() {
        let mut db = UnitDatabase::new();
        fill_simple(&mut db).unwrap();
        assert_eq!(db.convert("length", "m", "cm", 1.0).unwrap(), 100.0);
        assert_eq!(db.convert("length", "cm", "m", 250.0).unwrap(), 2.5);
        assert_eq!(db.convert("time", "min", "s", 2.0).unwrap(), 120.0);
        assert_eq!(db.convert("time", "d", "h", 1.0).unwrap(), 24.0);
    }

    #[test]
    fn test_default_database_conversions() {
        let mut db = UnitDatabase::new();
        fill_defaults(&mut db).unwrap();
        assert!(close(db.convert("mass", "lb", "kg", 1.0).unwrap(), 0.45359237));
        assert!(close(db.convert("pressure", "atm", "Pa", 1.0).unwrap(), 101325.0));
        assert!(close(db.convert("pressure", "bar", "kPa", 1.0).unwrap(), 100.0));
        assert!(close(db.convert("volume", "L", "m3", 500.0).unwrap(), 0.5));
        assert!(close(db.convert("velocity", "km/h", "m/s", 36.0).unwrap(), 10.0));
    }

    #[test]
    fn test_temperature_is_affine() {
        let mut db = UnitDatabase::new();
        fill_defaults(&mut db).unwrap();
        assert!(close(db.convert("temperature", "degC", "K", 0.0).unwrap(), 273.15));
        assert!(close(db.convert("temperature", "degF", "degC", 32.0).unwrap(), 0.0));
        assert!(close(db.convert("temperature", "degF", "degC", 212.0).unwrap(), 100.0));
    }

    #[test]
    fn test_every_quantity_type_has_a_category() {
        let mut db = UnitDatabase::new();
        fill_defaults(&mut db).unwrap();
        for quantity_type in db.quantity_types() {
            assert!(db.is_valid_category(quantity_type), "{quantity_type}");
        }
    }

    #[test]
    fn test_conversions_round_trip() {
        let mut db = UnitDatabase::new();
        fill_defaults(&mut db).unwrap();
        for quantity_type in db.quantity_types() {
            let units = db.units(quantity_type).unwrap();
            for from in &units {
                for to in &units {
                    for value in [-3.5, 0.0, 1.0, 1234.5] {
                        let there = db.convert(quantity_type, from, to, value).unwrap();
                        let back = db.convert(quantity_type, to, from, there).unwrap();
                        assert!(close(value, back), "{from} -> {to}: {value} != {back}");
                    }
                }
            }
        }
    }
}
