//! Checked 256-bit arithmetic
//!
//! Every balance and price in the engine is a 256-bit word. Unsigned amounts
//! use [`U256`] from the `uint` crate; signed quantities (conservation drift,
//! operator probes) use [`I256`], a two's complement wrapper over the same
//! limbs. Nothing in this module ever returns a wrapped result: an operation
//! either produces the exact mathematical value or fails with
//! [`ArithmeticError`].

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use crate::error::ArithmeticError;

uint::construct_uint! {
    /// Unsigned 256-bit word used for every amount and price.
    pub struct U256(4);
}

/// Fixed-point scale factor (1e18) for unit prices.
pub const WAD: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

pub type MathResult<T> = core::result::Result<T, ArithmeticError>;

// ============================================================================
// Unsigned helpers
// ============================================================================

#[inline]
pub fn add(a: U256, b: U256) -> MathResult<U256> {
    a.checked_add(b).ok_or(ArithmeticError::Overflow)
}

#[inline]
pub fn sub(a: U256, b: U256) -> MathResult<U256> {
    a.checked_sub(b).ok_or(ArithmeticError::Underflow)
}

#[inline]
pub fn mul(a: U256, b: U256) -> MathResult<U256> {
    a.checked_mul(b).ok_or(ArithmeticError::Overflow)
}

#[inline]
pub fn div(a: U256, b: U256) -> MathResult<U256> {
    a.checked_div(b).ok_or(ArithmeticError::DivisionByZero)
}

/// Divide rounding up. Never overflows: the quotient is at most `a`.
#[inline]
pub fn div_ceil(a: U256, b: U256) -> MathResult<U256> {
    if b.is_zero() {
        return Err(ArithmeticError::DivisionByZero);
    }
    let q = a / b;
    if (a % b).is_zero() {
        Ok(q)
    } else {
        add(q, U256::one())
    }
}

/// `a * b / d`, rounding down
#[inline]
pub fn mul_div(a: U256, b: U256, d: U256) -> MathResult<U256> {
    div(mul(a, b)?, d)
}

/// `a * b / d`, rounding up
#[inline]
pub fn mul_div_ceil(a: U256, b: U256, d: U256) -> MathResult<U256> {
    div_ceil(mul(a, b)?, d)
}

/// `10^exp`, failing instead of wrapping for exponents past 77.
pub fn pow10(exp: u32) -> MathResult<U256> {
    U256::from(10u64)
        .checked_pow(U256::from(exp))
        .ok_or(ArithmeticError::Overflow)
}

/// Parse a decimal amount, accepting `_` as a digit separator.
pub fn parse_amount(s: &str) -> Option<U256> {
    let digits: String = s.trim().chars().filter(|c| *c != '_').collect();
    if digits.is_empty() {
        return None;
    }
    U256::from_dec_str(&digits).ok()
}

// ============================================================================
// Signed 256-bit word
// ============================================================================

const SIGN_BIT: usize = 255;

/// Signed 256-bit integer in two's complement.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct I256(U256);

impl I256 {
    pub const ZERO: I256 = I256(U256([0, 0, 0, 0]));
    pub const ONE: I256 = I256(U256([1, 0, 0, 0]));
    pub const MAX: I256 = I256(U256([u64::MAX, u64::MAX, u64::MAX, i64::MAX as u64]));
    pub const MIN: I256 = I256(U256([0, 0, 0, 1 << 63]));

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.bit(SIGN_BIT)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Raw two's complement bits.
    #[inline]
    pub fn to_bits(self) -> U256 {
        self.0
    }

    #[inline]
    pub fn from_bits(bits: U256) -> Self {
        I256(bits)
    }

    pub fn from_i128(v: i128) -> Self {
        let magnitude = U256::from(v.unsigned_abs());
        if v < 0 {
            I256(twos_negate(magnitude))
        } else {
            I256(magnitude)
        }
    }

    /// Widen an unsigned amount, failing if it does not fit below `MAX`.
    pub fn try_from_unsigned(v: U256) -> MathResult<Self> {
        if v.bit(SIGN_BIT) {
            Err(ArithmeticError::Overflow)
        } else {
            Ok(I256(v))
        }
    }

    /// Absolute value as an unsigned word. `|MIN| = 2^255` fits.
    pub fn unsigned_abs(self) -> U256 {
        if self.is_negative() {
            twos_negate(self.0)
        } else {
            self.0
        }
    }

    pub fn checked_add(self, rhs: I256) -> MathResult<I256> {
        let (bits, _) = self.0.overflowing_add(rhs.0);
        let out = I256(bits);
        if self.is_negative() == rhs.is_negative() && out.is_negative() != self.is_negative() {
            return Err(direction(self.is_negative()));
        }
        Ok(out)
    }

    pub fn checked_sub(self, rhs: I256) -> MathResult<I256> {
        let (bits, _) = self.0.overflowing_sub(rhs.0);
        let out = I256(bits);
        if self.is_negative() != rhs.is_negative() && out.is_negative() != self.is_negative() {
            return Err(direction(self.is_negative()));
        }
        Ok(out)
    }

    pub fn checked_mul(self, rhs: I256) -> MathResult<I256> {
        let negative = self.is_negative() != rhs.is_negative();
        let (magnitude, wrapped) = self.unsigned_abs().overflowing_mul(rhs.unsigned_abs());
        if wrapped {
            return Err(direction(negative));
        }
        if negative {
            // -2^255 is the only magnitude with the sign bit set that still fits
            if magnitude > I256::MIN.0 {
                return Err(ArithmeticError::Underflow);
            }
            Ok(I256(twos_negate(magnitude)))
        } else {
            if magnitude.bit(SIGN_BIT) {
                return Err(ArithmeticError::Overflow);
            }
            Ok(I256(magnitude))
        }
    }

    pub fn checked_neg(self) -> MathResult<I256> {
        I256::ZERO.checked_sub(self)
    }
}

#[inline]
fn twos_negate(v: U256) -> U256 {
    (!v).overflowing_add(U256::one()).0
}

/// Out-of-range results on the negative side are underflows.
#[inline]
fn direction(negative: bool) -> ArithmeticError {
    if negative {
        ArithmeticError::Underflow
    } else {
        ArithmeticError::Overflow
    }
}

impl From<i64> for I256 {
    fn from(v: i64) -> Self {
        I256::from_i128(v as i128)
    }
}

impl From<i128> for I256 {
    fn from(v: i128) -> Self {
        I256::from_i128(v)
    }
}

impl Ord for I256 {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            // Same sign: two's complement bit patterns order correctly
            _ => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for I256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}", self.unsigned_abs())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I256({})", self)
    }
}

/// Error returned when a string is not a decimal in the signed 256-bit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseI256Error;

impl fmt::Display for ParseI256Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid signed 256-bit decimal")
    }
}

impl std::error::Error for ParseI256Error {}

impl FromStr for I256 {
    type Err = ParseI256Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let magnitude = parse_amount(digits).ok_or(ParseI256Error)?;
        if negative {
            if magnitude > I256::MIN.0 {
                return Err(ParseI256Error);
            }
            Ok(I256(twos_negate(magnitude)))
        } else {
            I256::try_from_unsigned(magnitude).map_err(|_| ParseI256Error)
        }
    }
}

// ============================================================================
// Signed operations and predicates
// ============================================================================

#[inline]
pub fn add_int(a: I256, b: I256) -> MathResult<I256> {
    a.checked_add(b)
}

#[inline]
pub fn sub_int(a: I256, b: I256) -> MathResult<I256> {
    a.checked_sub(b)
}

#[inline]
pub fn mul_int(a: I256, b: I256) -> MathResult<I256> {
    a.checked_mul(b)
}

/// True when `a + b` is representable.
#[inline]
pub fn can_add(a: I256, b: I256) -> bool {
    a.checked_add(b).is_ok()
}

/// True when `a - b` is representable.
#[inline]
pub fn can_sub(a: I256, b: I256) -> bool {
    a.checked_sub(b).is_ok()
}

/// True when `a * b` is representable.
#[inline]
pub fn can_mul(a: I256, b: I256) -> bool {
    a.checked_mul(b).is_ok()
}
