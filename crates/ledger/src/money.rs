use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{LedgerError, ResultLedger};

/// Signed money amount represented as **integer pence**.
///
/// There are 100 pence in a pound (Sterling). Expense and payment amounts
/// must be positive (see [`Pence::validate`]); negative values only show up
/// as net balances.
///
/// # Examples
///
/// ```rust
/// use ledger::Pence;
///
/// let amount = Pence::new(-307);
/// assert_eq!(amount.to_string(), "-£3.07");
/// assert_eq!("1.5".parse::<Pence>().unwrap(), Pence::new(150));
/// assert!("1.500".parse::<Pence>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Pence(i64);

impl Pence {
    pub const ZERO: Pence = Pence(0);

    /// Creates a new amount from integer pence.
    #[must_use]
    pub const fn new(pence: i64) -> Self {
        Self(pence)
    }

    /// Returns the raw value in pence.
    #[must_use]
    pub const fn pence(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Ensures the amount is strictly positive.
    ///
    /// The error keeps its historical name: zero is rejected as well.
    pub fn validate(self) -> ResultLedger<()> {
        if self.0 <= 0 {
            return Err(LedgerError::NegativePence(self));
        }
        Ok(())
    }

    /// Parses a textual amount such as `"12.34"`, `"12.3"`, `"12."` or `".5"`.
    ///
    /// Rules:
    /// - anything that changes under upper/lower casing (i.e. contains a
    ///   letter) is rejected;
    /// - at most one `.`;
    /// - empty major or minor parts count as zero;
    /// - the minor part has at most 2 digits, a single digit means tens of
    ///   pence (`".5"` is 50);
    /// - a sign on the major part applies to the whole amount.
    pub fn parse(s: &str) -> ResultLedger<Self> {
        let invalid = || LedgerError::InvalidMoneyStr(s.to_string());

        if s.to_uppercase() != s.to_lowercase() {
            return Err(invalid());
        }

        let (major_str, minor_str) = match s.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s, ""),
        };
        if minor_str.contains('.') {
            return Err(invalid());
        }

        let minor = parse_minor(minor_str).ok_or_else(invalid)?;
        let (negative, major) = parse_major(major_str).ok_or_else(invalid)?;

        let total = major
            .checked_mul(100)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(invalid)?;

        Ok(Pence(if negative { -total } else { total }))
    }
}

/// Minor part: `""` is 0, one digit is right-padded, more than two is an error.
fn parse_minor(s: &str) -> Option<i64> {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match s.len() {
        0 => Some(0),
        1 => s.parse::<i64>().ok().map(|tens| tens * 10),
        2 => s.parse().ok(),
        _ => None,
    }
}

/// Major part as (is_negative, absolute pounds).
fn parse_major(s: &str) -> Option<(bool, i64)> {
    if s.is_empty() {
        return Some((false, 0));
    }
    let negative = s.starts_with('-');
    let pounds: i64 = s.parse().ok()?;
    Some((negative, pounds.checked_abs()?))
}

impl fmt::Display for Pence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let pounds = abs / 100;
        let pence = abs % 100;
        write!(f, "{sign}£{pounds}.{pence:02}")
    }
}

impl FromStr for Pence {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pence::parse(s)
    }
}

impl From<i64> for Pence {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Pence> for i64 {
    fn from(value: Pence) -> Self {
        value.0
    }
}

impl Add for Pence {
    type Output = Pence;

    fn add(self, rhs: Pence) -> Self::Output {
        Pence(self.0 + rhs.0)
    }
}

impl AddAssign for Pence {
    fn add_assign(&mut self, rhs: Pence) {
        self.0 += rhs.0;
    }
}

impl Sub for Pence {
    type Output = Pence;

    fn sub(self, rhs: Pence) -> Self::Output {
        Pence(self.0 - rhs.0)
    }
}

impl SubAssign for Pence {
    fn sub_assign(&mut self, rhs: Pence) {
        self.0 -= rhs.0;
    }
}

impl Neg for Pence {
    type Output = Pence;

    fn neg(self) -> Self::Output {
        Pence(-self.0)
    }
}

impl Sum for Pence {
    fn sum<I: Iterator<Item = Pence>>(iter: I) -> Self {
        iter.fold(Pence::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Pence> for Pence {
    fn sum<I: Iterator<Item = &'a Pence>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
