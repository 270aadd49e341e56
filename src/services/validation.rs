//! Typed request inputs for the inventory service.
//!
//! Values are only constructible through their parsers, so a service method
//! taking an [`ItemName`] or a [`Quantity`] never sees unchecked input.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use std::fmt;

use crate::errors::ServiceError;

static ITEM_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,8}$").expect("item name pattern is valid"));

/// Name of a stocked item: one to eight latin letters, case preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemName(String);

impl ItemName {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        if ITEM_NAME_PATTERN.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ServiceError::ValidationError(format!(
                "name must be 1 to 8 latin letters, got {:?}",
                raw
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-negative unit count carried by add and sell requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quantity(i32);

impl Quantity {
    pub const DEFAULT: Quantity = Quantity(1);

    /// Reads an optional JSON `amount`. Absent or `null` means one unit.
    pub fn from_json(value: Option<&Value>) -> Result<Self, ServiceError> {
        let number = match value {
            None | Some(Value::Null) => return Ok(Self::DEFAULT),
            Some(Value::Number(n)) => n,
            Some(other) => {
                return Err(ServiceError::ValidationError(format!(
                    "amount must be an integer, got {}",
                    other
                )))
            }
        };

        let amount = number.as_i64().ok_or_else(|| {
            ServiceError::ValidationError(format!("amount must be an integer, got {}", number))
        })?;
        Self::new(amount)
    }

    pub fn new(amount: i64) -> Result<Self, ServiceError> {
        if amount < 0 {
            return Err(ServiceError::ValidationError(format!(
                "amount must not be negative, got {}",
                amount
            )));
        }
        i32::try_from(amount).map(Self).map_err(|_| {
            ServiceError::ValidationError(format!("amount {} is too large", amount))
        })
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

/// Unit price exactly as the caller sent it.
///
/// Only its presence is known at parse time; the value is checked after the
/// item lookup so that an unknown item reports 404 before a bad price does.
#[derive(Debug, Clone, PartialEq)]
pub struct Price(Value);

impl Price {
    /// `None` for an absent or `null` price.
    pub fn from_json(value: Option<Value>) -> Option<Self> {
        match value {
            None | Some(Value::Null) => None,
            Some(v) => Some(Self(v)),
        }
    }

    /// The unit price as a strictly positive, finite number.
    pub fn unit_value(&self) -> Result<f64, ServiceError> {
        let Value::Number(n) = &self.0 else {
            return Err(ServiceError::InvalidPrice(format!(
                "price must be a number, got {}",
                self.0
            )));
        };
        match n.as_f64() {
            Some(v) if v.is_finite() && v > 0.0 => Ok(v),
            _ => Err(ServiceError::InvalidPrice(format!(
                "price must be greater than zero, got {}",
                n
            ))),
        }
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

/// Revenue as JSON: whole values become integers, everything else stays a float.
pub fn revenue_json(total: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if total.is_finite() && total.fract() == 0.0 && total.abs() <= MAX_EXACT {
        Value::Number(Number::from(total as i64))
    } else {
        Number::from_f64(total).map(Value::Number).unwrap_or(Value::Null)
    }
}
