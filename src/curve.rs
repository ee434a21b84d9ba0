//! Price curve for the descending-price sale
//!
//! The unit price is quoted in funding-asset base units per [`WAD`] of the
//! offered asset. It is a pure function of the seconds elapsed since the
//! auction started and never drops below the floor derived from the sale
//! quantity.
//!
//! # Decay schedule
//! Time is cut into periods (one day by default). Period `d` opens at
//! `10^(ceiling_exponent - d)` and falls linearly, shedding
//! `decay_numerator / decay_denominator` of its opening value by the end of
//! the period:
//!
//! ```text
//! p(t) = 10^(E - d) * (P*den - num*r) / (P*den)     d = t / P, r = t % P
//! ```
//!
//! With the defaults (`P = 86400`, `E = 36`, `9/10`) this is the calibrated
//! schedule the reference table in the test suite is checked against. Past
//! period `E` the price sits at the floor.

use core::cmp::max;

use crate::error::{AuctionError, Result};
use crate::math::{self, U256, WAD};

/// Largest opening exponent accepted. `validate` additionally requires
/// `10^E * P * den` to fit in 256 bits.
pub const MAX_CEILING_EXPONENT: u32 = 60;

/// Parameters of the stepwise-exponential, intra-period linear decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecaySchedule {
    /// Length of one decay period in seconds
    pub period_secs: u64,
    /// Price exponent at elapsed zero (price = 10^E)
    pub ceiling_exponent: u32,
    /// Fraction of the opening price shed across one period (numerator)
    pub decay_numerator: u64,
    /// Fraction of the opening price shed across one period (denominator)
    pub decay_denominator: u64,
}

impl Default for DecaySchedule {
    fn default() -> Self {
        Self {
            period_secs: 86_400,
            ceiling_exponent: 36,
            decay_numerator: 9,
            decay_denominator: 10,
        }
    }
}

impl DecaySchedule {
    /// Rejects schedules whose price could rise or overflow.
    ///
    /// Each period opens one decade below the previous one, so a period may
    /// shed at most 9/10 of its opening value or the price would jump up at
    /// the next boundary.
    pub fn validate(&self) -> Result<()> {
        if self.period_secs == 0
            || self.decay_denominator == 0
            || (self.decay_numerator as u128) * 10 > (self.decay_denominator as u128) * 9
            || self.ceiling_exponent > MAX_CEILING_EXPONENT
        {
            return Err(AuctionError::InvalidSchedule);
        }
        let scale = self.period_scale()?;
        math::pow10(self.ceiling_exponent)
            .and_then(|opening| math::mul(opening, U256::from(scale)))
            .map_err(|_| AuctionError::InvalidSchedule)?;
        Ok(())
    }

    /// `P * den`, the divisor of the intra-period interpolation
    fn period_scale(&self) -> Result<u64> {
        self.period_secs
            .checked_mul(self.decay_denominator)
            .ok_or(AuctionError::InvalidSchedule)
    }

    /// Seconds after which the schedule is pinned at the floor for any quantity.
    pub fn horizon_secs(&self) -> u64 {
        (self.ceiling_exponent as u64 + 1).saturating_mul(self.period_secs)
    }
}

/// Minimum unit price for a sale of `sale_quantity` base units.
///
/// `ceil(WAD / q)` for `q < WAD`, otherwise 1. Guarantees that buying the
/// whole sale at the floor always costs at least one funding unit.
pub fn floor_price(sale_quantity: U256) -> Result<U256> {
    if sale_quantity.is_zero() {
        return Err(AuctionError::InvalidQuantity);
    }
    if sale_quantity < WAD {
        Ok(max(U256::one(), math::div_ceil(WAD, sale_quantity)?))
    } else {
        Ok(U256::one())
    }
}

/// Price curve bound to one sale quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceCurve {
    sale_quantity: U256,
    floor_price: U256,
    schedule: DecaySchedule,
}

impl PriceCurve {
    pub fn new(sale_quantity: U256, schedule: DecaySchedule) -> Result<Self> {
        schedule.validate()?;
        let floor_price = floor_price(sale_quantity)?;
        Ok(Self {
            sale_quantity,
            floor_price,
            schedule,
        })
    }

    pub fn with_default_schedule(sale_quantity: U256) -> Result<Self> {
        Self::new(sale_quantity, DecaySchedule::default())
    }

    pub fn sale_quantity(&self) -> U256 {
        self.sale_quantity
    }

    pub fn floor_price(&self) -> U256 {
        self.floor_price
    }

    pub fn schedule(&self) -> &DecaySchedule {
        &self.schedule
    }

    /// Unit price after `elapsed` seconds. Non-increasing, clamped to the floor.
    pub fn price(&self, elapsed: u64) -> Result<U256> {
        let s = &self.schedule;
        let period = elapsed / s.period_secs;
        if period > s.ceiling_exponent as u64 {
            return Ok(self.floor_price);
        }

        let into_period = elapsed % s.period_secs;
        let scale = s.period_scale()?;
        // num * r < num * P < den * P, so neither side can overflow u64
        let remaining = scale - s.decay_numerator * into_period;

        let opening = math::pow10(s.ceiling_exponent - period as u32)?;
        let raw = math::mul_div(opening, U256::from(remaining), U256::from(scale))?;

        Ok(max(raw, self.floor_price))
    }

    /// Funding amount needed to buy the whole sale at the price after `elapsed`.
    /// This is the live raise cap.
    pub fn total_to_end_auction(&self, elapsed: u64) -> Result<U256> {
        let price = self.price(elapsed)?;
        Ok(math::mul_div(price, self.sale_quantity, WAD)?)
    }
}
