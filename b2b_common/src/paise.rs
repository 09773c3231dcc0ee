use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const RUPEE_CURRENCY_CODE: &str = "INR";
pub const PAISE_PER_RUPEE: i64 = 100;
const BASIS_POINTS: i64 = 10_000;

//--------------------------------------        Paise         ---------------------------------------------------------
/// An amount of money in Indian paise (1/100th of a rupee).
///
/// All amounts in the order store are held as integer paise, so arithmetic is exact.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Paise(i64);

op!(binary Paise, Add, add);
op!(binary Paise, Sub, sub);
op!(inplace Paise, AddAssign, add_assign);
op!(inplace Paise, SubAssign, sub_assign);
op!(unary Paise, Neg, neg);

impl Sum for Paise {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in paise: {0}")]
pub struct PaiseConversionError(String);

impl From<i64> for Paise {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Paise {
    type Error = PaiseConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| PaiseConversionError(format!("Value {value} is too large to convert to Paise")))
    }
}

impl Display for Paise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let rupees = abs / PAISE_PER_RUPEE as u64;
        let paise = abs % PAISE_PER_RUPEE as u64;
        write!(f, "{sign}₹{rupees}.{paise:02}")
    }
}

impl Paise {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_rupees(rupees: i64) -> Self {
        Self(rupees * PAISE_PER_RUPEE)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// `self * rhs`, or `None` if the result does not fit.
    pub fn checked_mul(&self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Returns the given fraction of this amount, expressed in basis points (1/100th of a percent), rounded half up
    /// to the nearest paisa. `None` if the result does not fit.
    pub fn checked_basis_points(&self, bps: i64) -> Option<Self> {
        let scaled = i128::from(self.0) * i128::from(bps);
        let half = i128::from(BASIS_POINTS / 2);
        let divisor = i128::from(BASIS_POINTS);
        let rounded = if scaled >= 0 { (scaled + half) / divisor } else { (scaled - half) / divisor };
        i64::try_from(rounded).ok().map(Self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Paise::from_rupees(500).to_string(), "₹500.00");
        assert_eq!(Paise::from(5).to_string(), "₹0.05");
        assert_eq!(Paise::from(12_345).to_string(), "₹123.45");
        assert_eq!(Paise::from(-250).to_string(), "-₹2.50");
    }

    #[test]
    fn arithmetic() {
        let mut a = Paise::from_rupees(10);
        a += Paise::from(50);
        assert_eq!(a.value(), 1050);
        a -= Paise::from(1050);
        assert_eq!(a, Paise::default());
        assert_eq!(Paise::from(150).checked_mul(3), Some(Paise::from(450)));
        let total: Paise = [Paise::from(100), Paise::from(250), Paise::from(-50)].into_iter().sum();
        assert_eq!(total, Paise::from(300));
    }

    #[test]
    fn one_percent_fee() {
        let fee = |p: Paise| p.checked_basis_points(100);
        assert_eq!(fee(Paise::from_rupees(500)), Some(Paise::from_rupees(5)));
        // 1% of ₹1.50 is 1.5 paise, which rounds up
        assert_eq!(fee(Paise::from(150)), Some(Paise::from(2)));
        assert_eq!(fee(Paise::from(149)), Some(Paise::from(1)));
        assert_eq!(fee(Paise::from(0)), Some(Paise::from(0)));
        // The intermediate product would overflow an i64, but the fee itself fits
        assert_eq!(fee(Paise::from(i64::MAX)), Some(Paise::from(i64::MAX / 100)));
        assert_eq!(Paise::from(i64::MAX).checked_basis_points(20_000), None);
    }

    #[test]
    fn overflow_is_detected() {
        assert_eq!(Paise::from(4).checked_mul(i64::MAX / 2), None);
        assert_eq!(Paise::from(i64::MAX).checked_add(Paise::from(1)), None);
        assert_eq!(Paise::from(i64::MIN).checked_mul(-1), None);
        assert_eq!(Paise::from(1).checked_add(Paise::from(2)), Some(Paise::from(3)));
    }

    #[test]
    fn serializes_as_integer() {
        let json = serde_json::to_string(&Paise::from_rupees(3)).unwrap();
        assert_eq!(json, "300");
        let p: Paise = serde_json::from_str("42").unwrap();
        assert_eq!(p.value(), 42);
    }

    #[test]
    fn conversion_from_u64() {
        assert!(Paise::try_from(u64::MAX).is_err());
        assert_eq!(Paise::try_from(99u64).unwrap(), Paise::from(99));
    }
}
