//! Value amounts in the ledger's smallest unit.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Number of decimal places in one whole unit.
pub const DECIMALS: u32 = 18;

const UNIT: u128 = 10u128.pow(DECIMALS);

/// Non-negative amount of value, counted in the smallest unit (10^-18 of a whole unit).
///
/// Text form is a whole-unit decimal: `"1.0"`, `"0.0001"`, `"1000"`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_units(units: u128) -> Self {
        Self(units)
    }

    /// `whole` whole units (e.g. `from_whole(5)` is `"5.0"`).
    pub const fn from_whole(whole: u64) -> Self {
        Self(whole as u128 * UNIT)
    }

    pub const fn units(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn saturating_add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }

    /// Sum an iterator of amounts, failing on overflow.
    pub fn try_sum<I>(amounts: I) -> Result<Amount, DomainError>
    where
        I: IntoIterator<Item = Amount>,
    {
        amounts.into_iter().try_fold(Amount::ZERO, |acc, a| {
            acc.checked_add(a)
                .ok_or_else(|| DomainError::overflow("amount sum exceeds u128"))
        })
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        if frac == 0 {
            return write!(f, "{whole}.0");
        }
        let digits = format!("{frac:0width$}", width = DECIMALS as usize);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(DomainError::validation("amount is empty"));
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(DomainError::validation(format!("amount is not a decimal: {s}")));
        }
        if frac.len() > DECIMALS as usize {
            return Err(DomainError::validation(format!(
                "amount has more than {DECIMALS} decimal places: {s}"
            )));
        }

        let overflow = || DomainError::overflow(format!("amount too large: {s}"));

        let whole_units = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .map_err(|_| overflow())?
                .checked_mul(UNIT)
                .ok_or_else(overflow)?
        };

        let frac_units = if frac.is_empty() {
            0
        } else {
            let scale = 10u128.pow(DECIMALS - frac.len() as u32);
            // At most 18 digits, always fits.
            frac.parse::<u128>().map_err(|_| overflow())? * scale
        };

        whole_units
            .checked_add(frac_units)
            .map(Amount)
            .ok_or_else(overflow)
    }
}
