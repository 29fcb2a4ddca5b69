use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// A runtime number. Arithmetic follows IEEE-754, so dividing by zero
/// produces an infinity or NaN instead of failing.
#[derive(Default, Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Value(f64);

impl Value {
    pub fn new(number: f64) -> Self {
        Self(number)
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let number = self.0;
        if number.is_nan() {
            write!(f, "NaN")
        } else if number.is_infinite() {
            let sign = if number.is_sign_negative() { "-" } else { "" };
            write!(f, "{sign}Infinity")
        } else if number != 0.0 && !(1e-6..1e21).contains(&number.abs()) {
            write_exponent(f, number)
        } else {
            write!(f, "{number}")
        }
    }
}

/// Writes `number` as `1.5e+21` / `1.5e-7`, the shortest digits that round-trip.
fn write_exponent(f: &mut fmt::Formatter<'_>, number: f64) -> fmt::Result {
    let formatted = format!("{number:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            write!(f, "{mantissa}e+{exponent}")
        }
        _ => write!(f, "{formatted}"),
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<Value> for f64 {
    fn from(value: Value) -> Self {
        value.0
    }
}

macro_rules! arithmetic {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for Value {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(self.0 $op rhs.0)
            }
        }
    };
}

arithmetic!(Add, add, +);
arithmetic!(Sub, sub, -);
arithmetic!(Mul, mul, *);
arithmetic!(Div, div, /);
