//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity** - they are defined entirely by their
//! attribute values and are immutable. `Money` is the one the ledger and order
//! engine lean on.

use core::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Marker trait for value objects.
///
/// The trait requires `Clone + PartialEq + Debug`: value objects are compared by
/// their attribute values and are cheap to copy.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// An amount of money in the smallest currency unit (e.g., cents).
///
/// Totals are computed by integer arithmetic so that an order's total is exactly
/// the sum of its line totals. Arithmetic is checked: overflow surfaces as `None`
/// rather than wrapping.
///
/// On the wire an amount is a decimal number of currency units (`19.99`).
/// More than two fractional digits is rejected rather than rounded.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

/// Number of fractional digits carried by an amount.
const MINOR_DIGITS: u32 = 2;

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Parse a decimal amount such as `"19.99"` or `"15"`.
    pub fn from_decimal_str(raw: &str) -> Result<Self, String> {
        let amount = Decimal::from_str(raw.trim())
            .map_err(|e| format!("invalid amount '{raw}': {e}"))?;
        Self::from_decimal(amount)
    }

    fn from_decimal(amount: Decimal) -> Result<Self, String> {
        let amount = amount.normalize();
        if amount.scale() > MINOR_DIGITS {
            return Err(format!(
                "amount {amount} has more than {MINOR_DIGITS} decimal places"
            ));
        }
        amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|minor| minor.to_i64())
            .map(Money)
            .ok_or_else(|| format!("amount {amount} is out of range"))
    }

    /// The amount in currency units, as sent on the wire.
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, MINOR_DIGITS)
    }

    /// Unit price times quantity.
    pub fn checked_times(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Division by 100 is correctly rounded, so 1999 prints as 19.99.
        serializer.serialize_f64(self.0 as f64 / 100.0)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl de::Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("a decimal amount with at most two fractional digits")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Money::from_decimal(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Money::from_decimal(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom("amount must be finite"));
        }
        // The shortest round-trip form of the float is what the client wrote.
        Money::from_decimal_str(&v.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Money::from_decimal_str(v).map_err(E::custom)
    }
}
