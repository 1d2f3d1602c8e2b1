use std::fmt;

use rust_decimal::Decimal;

use crate::EngineError;

/// Positive money amount represented as **integer cents**.
///
/// Every stored transaction amount goes through this type, so the database
/// never holds a float and never holds a fraction of a cent.
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
/// use rust_decimal::Decimal;
///
/// let amount = MoneyCents::try_from(Decimal::new(9050, 2)).unwrap();
/// assert_eq!(amount.cents(), 9050);
/// assert_eq!(amount.to_string(), "90.50");
/// ```
///
/// Conversion from user input rejects zero, negatives and more than 2
/// decimals:
///
/// ```rust
/// use engine::MoneyCents;
/// use rust_decimal::Decimal;
///
/// assert!(MoneyCents::try_from(Decimal::ZERO).is_err());
/// assert!(MoneyCents::try_from(Decimal::new(-100, 2)).is_err());
/// assert!(MoneyCents::try_from(Decimal::new(12345, 3)).is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns the amount as an exact decimal with scale 2.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl TryFrom<Decimal> for MoneyCents {
    type Error = EngineError;

    /// Validation rules:
    /// - amount must be > 0
    /// - max 2 fractional digits (rejects `12.345`, accepts `12.340`)
    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "amount must be greater than 0".to_string(),
            ));
        }

        let normalized = value.normalize();
        if normalized.scale() > 2 {
            return Err(EngineError::Validation(
                "amount must have at most 2 decimal places".to_string(),
            ));
        }

        let cents = normalized
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|v| i64::try_from(v).ok())
            .ok_or_else(|| EngineError::Validation("amount too large".to_string()))?;

        Ok(MoneyCents(cents))
    }
}
