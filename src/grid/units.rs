/*
Copyright 2021 Jakub Lewandowski

This file is part of Ocean Model Skill Assessment (OMSA).

Ocean Model Skill Assessment (OMSA) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Ocean Model Skill Assessment (OMSA) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Ocean Model Skill Assessment (OMSA). If not, see https://www.gnu.org/licenses/.
*/

//! Conversion between physical units of model
//! and observation values.
//!
//! Only units met in sea-state comparisons are known here:
//! temperature, length, speed, pressure and salinity.

use crate::{errors::UnitError, Float};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
enum Quantity {
    Temperature,
    Length,
    Speed,
    Pressure,
    Salinity,
    Dimensionless,
}

/// Unit expressed as a linear transform into SI base unit.
#[derive(Copy, Clone, PartialEq, Debug)]
struct Unit {
    quantity: Quantity,
    scale: Float,
    offset: Float,
}

impl Unit {
    fn new(quantity: Quantity, scale: Float, offset: Float) -> Self {
        Unit {
            quantity,
            scale,
            offset,
        }
    }

    fn parse(symbol: &str) -> Result<Self, UnitError> {
        use Quantity::*;

        let normalized = symbol.trim().to_lowercase().replace('°', "deg");

        let unit = match normalized.as_str() {
            "k" | "kelvin" | "degk" | "deg_k" => Unit::new(Temperature, 1.0, 0.0),
            "degc" | "deg_c" | "c" | "celsius" | "degree_celsius" | "degrees_celsius" => {
                Unit::new(Temperature, 1.0, 273.15)
            }
            "degf" | "deg_f" | "f" | "fahrenheit" | "degree_fahrenheit" | "degrees_fahrenheit" => {
                Unit::new(Temperature, 5.0 / 9.0, 273.15 - 32.0 * 5.0 / 9.0)
            }
            "m" | "meter" | "meters" | "metre" | "metres" => Unit::new(Length, 1.0, 0.0),
            "cm" | "centimeters" => Unit::new(Length, 0.01, 0.0),
            "mm" | "millimeters" => Unit::new(Length, 0.001, 0.0),
            "km" | "kilometers" => Unit::new(Length, 1000.0, 0.0),
            "ft" | "feet" | "foot" => Unit::new(Length, 0.3048, 0.0),
            "m/s" | "m s-1" | "m.s-1" | "meters/second" => Unit::new(Speed, 1.0, 0.0),
            "cm/s" | "cm s-1" | "cm.s-1" => Unit::new(Speed, 0.01, 0.0),
            "knots" | "knot" | "kt" | "kts" => Unit::new(Speed, 1852.0 / 3600.0, 0.0),
            "mph" => Unit::new(Speed, 0.44704, 0.0),
            "pa" => Unit::new(Pressure, 1.0, 0.0),
            "hpa" | "mbar" | "mb" => Unit::new(Pressure, 100.0, 0.0),
            "dbar" | "decibar" => Unit::new(Pressure, 1.0e4, 0.0),
            "bar" => Unit::new(Pressure, 1.0e5, 0.0),
            "psu" | "pss" | "pss-78" | "1e-3" | "0.001" => Unit::new(Salinity, 1.0, 0.0),
            "1" | "" => Unit::new(Dimensionless, 1.0, 0.0),
            _ => return Err(UnitError::Unknown(symbol.to_string())),
        };

        Ok(unit)
    }
}

/// Precomputed conversion between two compatible units.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Conversion {
    from: Unit,
    to: Unit,
}

impl Conversion {
    /// Checks that both units are known and describe the same quantity.
    pub fn new(from: &str, to: &str) -> Result<Self, UnitError> {
        let from_unit = Unit::parse(from)?;
        let to_unit = Unit::parse(to)?;

        if from_unit.quantity != to_unit.quantity {
            return Err(UnitError::Incompatible {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        Ok(Conversion {
            from: from_unit,
            to: to_unit,
        })
    }

    pub fn apply(&self, value: Float) -> Float {
        let si = value * self.from.scale + self.from.offset;

        (si - self.to.offset) / self.to.scale
    }
}

/// Convenience function to convert a single value.
pub fn convert(value: Float, from: &str, to: &str) -> Result<Float, UnitError> {
    Ok(Conversion::new(from, to)?.apply(value))
}
