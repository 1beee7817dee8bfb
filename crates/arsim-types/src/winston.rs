//! Arbitrary-precision Winston amounts.
//!
//! Balances on the network exceed `u64` and clients exchange them as decimal
//! strings, so amounts are kept as normalized decimal digit strings and the
//! arithmetic works digit by digit.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// A non-negative amount of Winston, the smallest unit of the native currency.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Winston(String);

impl Winston {
    pub fn zero() -> Self {
        Self("0".into())
    }

    /// Parse a decimal string. Leading zeros are stripped; an empty string is zero.
    pub fn parse(value: &str) -> TypeResult<Self> {
        let trimmed = value.trim();
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypeError::InvalidWinston(value.to_string()));
        }
        let digits = trimmed.trim_start_matches('0');
        if digits.is_empty() {
            Ok(Self::zero())
        } else {
            Ok(Self(digits.to_string()))
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == "0"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `self + other`.
    pub fn add(&self, other: &Winston) -> Winston {
        let a = self.0.as_bytes();
        let b = other.0.as_bytes();
        let mut out = Vec::with_capacity(a.len().max(b.len()) + 1);
        let mut carry = 0u8;
        let mut i = a.len();
        let mut j = b.len();
        while i > 0 || j > 0 || carry > 0 {
            let da = if i > 0 { i -= 1; a[i] - b'0' } else { 0 };
            let db = if j > 0 { j -= 1; b[j] - b'0' } else { 0 };
            let sum = da + db + carry;
            out.push(b'0' + sum % 10);
            carry = sum / 10;
        }
        Self::from_reversed_digits(out)
    }

    /// `self - other`, or `None` when the result would be negative.
    pub fn checked_sub(&self, other: &Winston) -> Option<Winston> {
        if *self < *other {
            return None;
        }
        let a = self.0.as_bytes();
        let b = other.0.as_bytes();
        let mut out = Vec::with_capacity(a.len());
        let mut borrow = 0i8;
        let mut j = b.len();
        for i in (0..a.len()).rev() {
            let db = if j > 0 { j -= 1; (b[j] - b'0') as i8 } else { 0 };
            let mut diff = (a[i] - b'0') as i8 - db - borrow;
            if diff < 0 {
                diff += 10;
                borrow = 1;
            } else {
                borrow = 0;
            }
            out.push(b'0' + diff as u8);
        }
        Some(Self::from_reversed_digits(out))
    }

    fn from_reversed_digits(mut digits: Vec<u8>) -> Winston {
        while digits.len() > 1 && digits.last() == Some(&b'0') {
            digits.pop();
        }
        digits.reverse();
        // Every byte pushed above is an ASCII digit.
        Self(String::from_utf8(digits).unwrap_or_else(|_| "0".into()))
    }
}

impl Default for Winston {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for Winston {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Winston {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<String> for Winston {
    type Error = TypeError;

    fn try_from(value: String) -> TypeResult<Self> {
        Self::parse(&value)
    }
}

impl From<Winston> for String {
    fn from(w: Winston) -> String {
        w.0
    }
}

impl From<u64> for Winston {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl std::str::FromStr for Winston {
    type Err = TypeError;

    fn from_str(s: &str) -> TypeResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Debug for Winston {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Winston({})", self.0)
    }
}

impl fmt::Display for Winston {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn w(s: &str) -> Winston {
        Winston::parse(s).unwrap()
    }

    #[test]
    fn parse_normalizes() {
        assert_eq!(w("000120").as_str(), "120");
        assert_eq!(w("").as_str(), "0");
        assert_eq!(w("0000").as_str(), "0");
        assert!(Winston::parse("-5").is_err());
        assert!(Winston::parse("1.5").is_err());
    }

    #[test]
    fn add_carries_across_digits() {
        assert_eq!(w("999").add(&w("1")), w("1000"));
        assert_eq!(w("0").add(&w("0")), w("0"));
    }

    #[test]
    fn sub_borrows_and_trims() {
        assert_eq!(w("5000").checked_sub(&w("1000")), Some(w("4000")));
        assert_eq!(w("1000").checked_sub(&w("1")), Some(w("999")));
        assert_eq!(w("42").checked_sub(&w("42")), Some(Winston::zero()));
        assert_eq!(w("41").checked_sub(&w("42")), None);
    }

    #[test]
    fn exceeds_u64() {
        let big = w("18446744073709551615");
        assert_eq!(big.add(&w("1")).as_str(), "18446744073709551616");
    }

    #[test]
    fn ordering_compares_magnitude() {
        assert!(w("100") > w("99"));
        assert!(w("12") < w("21"));
    }

    #[test]
    fn serde_uses_decimal_string() {
        assert_eq!(serde_json::to_string(&w("7")).unwrap(), "\"7\"");
        let parsed: Winston = serde_json::from_str("\"0042\"").unwrap();
        assert_eq!(parsed, w("42"));
    }

    proptest! {
        #[test]
        fn matches_u128_arithmetic(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
            let (wa, wb) = (Winston::from(a), Winston::from(b));
            let sum = (a as u128) + (b as u128);
            let total = wa.add(&wb);
            prop_assert_eq!(total.as_str(), sum.to_string());
            match a.checked_sub(b) {
                Some(d) => prop_assert_eq!(wa.checked_sub(&wb), Some(Winston::from(d))),
                None => prop_assert_eq!(wa.checked_sub(&wb), None),
            }
        }
    }
}
