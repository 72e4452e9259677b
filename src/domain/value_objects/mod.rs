//! Value Objects for the storefront core

use chrono::{NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Money value object, in integer minor units (cents)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(minor: i64) -> Self { Self(minor) }
    pub fn minor(&self) -> i64 { self.0 }
    pub fn add(self, other: Money) -> Money { Money(self.0.saturating_add(other.0)) }
    pub fn multiply(self, qty: u32) -> Money { Money(self.0.saturating_mul(i64::from(qty))) }

    /// Major-unit view for display. Never used for arithmetic.
    pub fn to_decimal(self) -> Decimal { Decimal::new(self.0, 2) }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self { iter.fold(Money::ZERO, Money::add) }
}

/// Merchant-locale currency presentation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyFormat {
    symbol: String,
    symbol_spacing: bool,
    decimal_separator: char,
    grouping_separator: char,
}

impl CurrencyFormat {
    /// Brazilian real, `R$ 1.234,56`.
    pub fn brl() -> Self {
        Self { symbol: "R$".into(), symbol_spacing: true, decimal_separator: ',', grouping_separator: '.' }
    }

    /// US dollar, `$1,234.56`.
    pub fn usd() -> Self {
        Self { symbol: "$".into(), symbol_spacing: false, decimal_separator: '.', grouping_separator: ',' }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "BRL" => Some(Self::brl()),
            "USD" => Some(Self::usd()),
            _ => None,
        }
    }

    pub fn format(&self, amount: Money) -> String {
        let value = amount.to_decimal();
        let digits = value.abs().to_string();
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(self.grouping_separator);
            }
            grouped.push(ch);
        }

        let sign = if value.is_sign_negative() && !value.is_zero() { "-" } else { "" };
        let space = if self.symbol_spacing { " " } else { "" };
        format!("{sign}{}{space}{grouped}{}{frac_part}", self.symbol, self.decimal_separator)
    }
}

impl Default for CurrencyFormat { fn default() -> Self { Self::brl() } }

/// Wall-clock "HH:MM" value in the merchant's civil timezone, stored as minute of day
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Last minute of the day, used when an open day has no end time.
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(23 * 60 + 59);

    pub fn parse(value: &str) -> Result<Self, TimeOfDayError> {
        let value = value.trim();
        let time = NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| TimeOfDayError(value.to_string()))?;
        Ok(Self::from_naive(time))
    }

    pub fn from_naive(time: NaiveTime) -> Self { Self((time.hour() * 60 + time.minute()) as u16) }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> { NaiveTime::from_hms_opt(hour, minute, 0).map(Self::from_naive) }

    /// Minute of day, 0..=1439.
    pub fn minutes(&self) -> u32 { u32::from(self.0) }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time of day {0:?}, expected HH:MM")]
pub struct TimeOfDayError(pub String);

/// Merchant contact number reduced to its digits (country and area code included)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactNumber(String);

impl ContactNumber {
    pub fn new(raw: &str) -> Result<Self, ContactNumberError> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() { return Err(ContactNumberError::NoDigits); }
        Ok(Self(digits))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ContactNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactNumberError {
    #[error("contact number contains no digits")]
    NoDigits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_arithmetic() {
        let unit = Money::from_minor(2500);
        assert_eq!(unit.multiply(2), Money::from_minor(5000));
        assert_eq!(unit.add(Money::from_minor(150)).minor(), 2650);
        let total: Money = [unit, Money::from_minor(100)].into_iter().sum();
        assert_eq!(total.minor(), 2600);
    }

    #[test]
    fn test_brl_format() {
        let brl = CurrencyFormat::brl();
        assert_eq!(brl.format(Money::from_minor(5000)), "R$ 50,00");
        assert_eq!(brl.format(Money::from_minor(123456)), "R$ 1.234,56");
        assert_eq!(brl.format(Money::from_minor(5)), "R$ 0,05");
        assert_eq!(brl.format(Money::ZERO), "R$ 0,00");
    }

    #[test]
    fn test_usd_format() {
        let usd = CurrencyFormat::from_code("usd").unwrap();
        assert_eq!(usd.format(Money::from_minor(123456789)), "$1,234,567.89");
        assert!(CurrencyFormat::from_code("EUR").is_none());
    }

    #[test]
    fn test_time_of_day() {
        let t = TimeOfDay::parse("09:30").unwrap();
        assert_eq!(t.minutes(), 570);
        assert_eq!(t.to_string(), "09:30");
        assert_eq!(TimeOfDay::END_OF_DAY.minutes(), 1439);
        assert!(TimeOfDay::parse("25:00").is_err());
        assert!(TimeOfDay::parse("noon").is_err());
    }

    #[test]
    fn test_contact_number() {
        assert_eq!(ContactNumber::new("+55 (11) 9 9999-0000").unwrap().as_str(), "5511999990000");
        assert_eq!(ContactNumber::new("n/a"), Err(ContactNumberError::NoDigits));
    }
}
