//! Non-negative currency amounts with exactly two fractional digits.
//!
//! Amounts are held as integer minor units so the ledger can compare and
//! subtract them inside a single SQL statement. Parsing and presentation go
//! through `rust_decimal` so no binary float ever touches a balance.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("not a decimal number: {0}")]
    Parse(String),

    #[error("amount must not be negative: {0}")]
    Negative(Decimal),

    #[error("amount has more than {max} fractional digits: {value}", max = Amount::SCALE)]
    TooPrecise { value: Decimal },

    #[error("amount out of range: {0}")]
    OutOfRange(Decimal),
}

/// Currency amount in minor units (hundredths).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    minor: i64,
}

impl Amount {
    /// Fractional digits kept by every amount.
    pub const SCALE: u32 = 2;

    pub const ZERO: Self = Amount { minor: 0 };

    /// Builds an amount from minor units; `None` if negative.
    pub const fn from_minor(minor: i64) -> Option<Self> {
        if minor < 0 {
            None
        } else {
            Some(Amount { minor })
        }
    }

    pub const fn minor(self) -> i64 {
        self.minor
    }

    pub fn parse(s: &str) -> Result<Self, AmountError> {
        let trimmed = s.trim();
        let decimal =
            Decimal::from_str(trimmed).map_err(|_| AmountError::Parse(trimmed.to_string()))?;
        Amount::try_from(decimal)
    }

    pub fn is_zero(self) -> bool {
        self.minor == 0
    }

    /// `None` when the result would go below zero.
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.minor.checked_sub(rhs.minor).and_then(Amount::from_minor)
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.minor, Self::SCALE)
    }

    /// Presentation form with `places` fractional digits.
    pub fn format(self, places: u32) -> String {
        format!("{:.*}", places as usize, self.to_decimal())
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value));
        }

        let normalized = value.normalize();
        if normalized.scale() > Self::SCALE {
            return Err(AmountError::TooPrecise { value });
        }

        let mut scaled = normalized;
        scaled.rescale(Self::SCALE);
        let minor = i64::try_from(scaled.mantissa()).map_err(|_| AmountError::OutOfRange(value))?;

        Ok(Amount { minor: minor.abs() })
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(Self::SCALE))
    }
}

// JSON responses carry balances as plain numbers.
impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = self.to_decimal().to_f64().unwrap_or_default();
        serializer.serialize_f64(value)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let decimal = <Decimal as Deserialize>::deserialize(deserializer)?;
        Amount::try_from(decimal).map_err(serde::de::Error::custom)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.minor))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let minor = i64::column_result(value)?;
        Amount::from_minor(minor).ok_or(FromSqlError::OutOfRange(minor))
    }
}
