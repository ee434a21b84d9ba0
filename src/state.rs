//! Auction state and lifecycle
//!
//! An [`Auction`] moves through
//! `Created -> Started -> Closed -> Finalized -> Destructed`.
//! `start`, `finalize` and `destruct` live here; `bid` and `claim` are in
//! their own modules and drive the same state. Every mutating method takes
//! `&mut self`, so a single owner already sees operations in a strict
//! total order. [`crate::shared::SharedAuction`] provides the same guarantee
//! across threads.
//!
//! All methods validate and compute first, then perform the (fallible)
//! ledger call, and only then write to `self`. A returned error therefore
//! never leaves a partially updated auction behind.

use std::collections::BTreeMap;

use log::info;

use crate::curve::{DecaySchedule, PriceCurve};
use crate::error::{AuctionError, Result};
use crate::ledger::{short, Address, AssetLedger, ZERO_ADDRESS};
use crate::math::{self, I256, U256, WAD};

// ============================================================================
// Lifecycle types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Created by the house, not yet accepting bids
    Created,
    /// Accepting bids
    Started,
    /// Cap reached, waiting for finalize
    Closed,
    /// Uniform price fixed, claims open
    Finalized,
    /// Torn down; no further operations
    Destructed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Created => "created",
            Phase::Started => "started",
            Phase::Closed => "closed",
            Phase::Finalized => "finalized",
            Phase::Destructed => "destructed",
        }
    }
}

/// What finalize does with the funding asset held in escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowPolicy {
    /// Destroy it through the ledger
    Burn,
    /// Hand it to a treasury address
    Release { to: Address },
}

/// Admission check run when an auction starts (the house's cooldown).
pub trait LaunchGate {
    fn check_launch(&self, token: &Address, now: u64) -> Result<()>;
}

/// Gate that admits every launch
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl LaunchGate for OpenGate {
    fn check_launch(&self, _token: &Address, _now: u64) -> Result<()> {
        Ok(())
    }
}

/// Construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuctionParams {
    /// Ledger identity of the auction (holds escrow and the offered asset)
    pub address: Address,
    /// Offered asset
    pub token: Address,
    /// Asset bids are paid in
    pub funding_token: Address,
    pub sale_quantity: U256,
    pub schedule: DecaySchedule,
    /// Receives offered-asset dust at destruct
    pub beneficiary: Address,
    pub escrow_policy: EscrowPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeReceipt {
    pub final_price: U256,
    pub received_total: U256,
    pub end_time: u64,
    /// Funding asset burned or released
    pub escrow_disposed: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestructReceipt {
    /// Offered asset returned to the beneficiary
    pub dust_returned: U256,
    /// False when the auction was already torn down
    pub torn_down: bool,
}

/// Point-in-time view of every auction attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionSnapshot {
    pub phase: Phase,
    pub sale_quantity: U256,
    pub floor_price: U256,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub received_total: U256,
    pub settled_total: U256,
    pub final_price: Option<U256>,
    pub bid_count: u64,
    pub claim_count: u64,
}

// ============================================================================
// Auction
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auction {
    pub(crate) address: Address,
    pub(crate) token: Address,
    pub(crate) funding_token: Address,
    pub(crate) beneficiary: Address,
    pub(crate) escrow_policy: EscrowPolicy,
    pub(crate) curve: PriceCurve,

    pub(crate) phase: Phase,
    pub(crate) start_time: Option<u64>,
    pub(crate) end_time: Option<u64>,
    /// Cumulative accepted contributions
    pub(crate) received_total: U256,
    /// Contributions already turned into payouts by claims
    pub(crate) settled_total: U256,
    pub(crate) final_price: Option<U256>,
    pub(crate) bid_count: u64,
    pub(crate) claim_count: u64,

    /// Outstanding contribution per bidder, zeroed on claim
    pub(crate) bids: BTreeMap<Address, U256>,
}

impl Auction {
    pub fn new(params: AuctionParams) -> Result<Self> {
        if params.token == ZERO_ADDRESS || params.funding_token == ZERO_ADDRESS {
            return Err(AuctionError::InvalidToken);
        }
        let curve = PriceCurve::new(params.sale_quantity, params.schedule)?;

        Ok(Self {
            address: params.address,
            token: params.token,
            funding_token: params.funding_token,
            beneficiary: params.beneficiary,
            escrow_policy: params.escrow_policy,
            curve,
            phase: Phase::Created,
            start_time: None,
            end_time: None,
            received_total: U256::zero(),
            settled_total: U256::zero(),
            final_price: None,
            bid_count: 0,
            claim_count: 0,
            bids: BTreeMap::new(),
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn token(&self) -> &Address {
        &self.token
    }

    pub fn funding_token(&self) -> &Address {
        &self.funding_token
    }

    pub fn beneficiary(&self) -> &Address {
        &self.beneficiary
    }

    pub fn escrow_policy(&self) -> EscrowPolicy {
        self.escrow_policy
    }

    pub fn curve(&self) -> &PriceCurve {
        &self.curve
    }

    pub fn sale_quantity(&self) -> U256 {
        self.curve.sale_quantity()
    }

    pub fn floor_price(&self) -> U256 {
        self.curve.floor_price()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn started(&self) -> bool {
        self.phase != Phase::Created
    }

    pub fn finalized(&self) -> bool {
        matches!(self.phase, Phase::Finalized | Phase::Destructed)
    }

    pub fn destructed(&self) -> bool {
        self.phase == Phase::Destructed
    }

    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<u64> {
        self.end_time
    }

    pub fn received_total(&self) -> U256 {
        self.received_total
    }

    pub fn settled_total(&self) -> U256 {
        self.settled_total
    }

    pub fn final_price(&self) -> Option<U256> {
        self.final_price
    }

    pub fn bid_count(&self) -> u64 {
        self.bid_count
    }

    pub fn claim_count(&self) -> u64 {
        self.claim_count
    }

    pub fn snapshot(&self) -> AuctionSnapshot {
        AuctionSnapshot {
            phase: self.phase,
            sale_quantity: self.sale_quantity(),
            floor_price: self.floor_price(),
            start_time: self.start_time,
            end_time: self.end_time,
            received_total: self.received_total,
            settled_total: self.settled_total,
            final_price: self.final_price,
            bid_count: self.bid_count,
            claim_count: self.claim_count,
        }
    }

    // ------------------------------------------------------------------------
    // Price queries (pure)
    // ------------------------------------------------------------------------

    /// Seconds since start; zero before start or if the clock reads earlier.
    pub fn elapsed(&self, now: u64) -> u64 {
        match self.start_time {
            Some(start) => now.saturating_sub(start),
            None => 0,
        }
    }

    /// Current unit price
    pub fn price(&self, now: u64) -> Result<U256> {
        self.curve.price(self.elapsed(now))
    }

    /// Funding amount that would buy out the whole sale right now
    pub fn total_to_end_auction(&self, now: u64) -> Result<U256> {
        self.curve.total_to_end_auction(self.elapsed(now))
    }

    /// Funding asset the auction should be holding in escrow.
    pub fn expected_escrow(&self) -> Result<U256> {
        if self.finalized() {
            return Ok(U256::zero());
        }
        Ok(math::sub(self.received_total, self.settled_total)?)
    }

    /// Actual escrow minus expected escrow. Zero whenever the books balance.
    pub fn escrow_drift<L: AssetLedger + ?Sized>(&self, ledger: &L) -> Result<I256> {
        let held = I256::try_from_unsigned(ledger.balance_of(&self.funding_token, &self.address))?;
        let expected = I256::try_from_unsigned(self.expected_escrow()?)?;
        Ok(math::sub_int(held, expected)?)
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Open the auction for bids.
    pub fn start<G: LaunchGate + ?Sized>(&mut self, gate: &G, now: u64) -> Result<()> {
        match self.phase {
            Phase::Created => {}
            Phase::Destructed => return Err(AuctionError::Destructed),
            _ => return Err(AuctionError::AlreadyStarted),
        }
        gate.check_launch(&self.token, now)?;

        self.start_time = Some(now);
        self.phase = Phase::Started;
        info!(
            "auction {} started at {} selling {} (floor {})",
            short(&self.address),
            now,
            self.sale_quantity(),
            self.floor_price()
        );
        Ok(())
    }

    /// Fix the uniform clearing price and dispose of the escrowed funding asset.
    ///
    /// `final_price = ceil(WAD * received_total / sale_quantity) + 1`
    ///
    /// An auction whose price has decayed until the live cap is at or below
    /// `received_total` counts as closed even without a crossing bid; its
    /// `end_time` is recorded here.
    pub fn finalize<L: AssetLedger + ?Sized>(&mut self, ledger: &mut L, now: u64) -> Result<FinalizeReceipt> {
        let end_time = match self.phase {
            Phase::Created => return Err(AuctionError::NotStarted),
            Phase::Finalized => return Err(AuctionError::AlreadyFinalized),
            Phase::Destructed => return Err(AuctionError::Destructed),
            Phase::Closed => self.end_time.unwrap_or(now),
            Phase::Started => {
                let cap = self.total_to_end_auction(now)?;
                if self.received_total.is_zero() || self.received_total < cap {
                    return Err(AuctionError::AuctionNotClosed);
                }
                now
            }
        };

        let ratio = math::mul_div_ceil(WAD, self.received_total, self.sale_quantity())?;
        let final_price = math::add(ratio, U256::one())?;

        let escrow = ledger.balance_of(&self.funding_token, &self.address);
        if !escrow.is_zero() {
            match self.escrow_policy {
                EscrowPolicy::Burn => ledger.burn(&self.funding_token, &self.address, escrow)?,
                EscrowPolicy::Release { to } => {
                    ledger.transfer(&self.funding_token, &self.address, &to, escrow)?
                }
            }
        }

        self.end_time = Some(end_time);
        self.final_price = Some(final_price);
        self.phase = Phase::Finalized;
        info!(
            "auction {} finalized: received {} final price {} ({} escrow {})",
            short(&self.address),
            self.received_total,
            final_price,
            escrow,
            match self.escrow_policy {
                EscrowPolicy::Burn => "burned",
                EscrowPolicy::Release { .. } => "released",
            }
        );

        Ok(FinalizeReceipt {
            final_price,
            received_total: self.received_total,
            end_time,
            escrow_disposed: escrow,
        })
    }

    /// Tear the auction down once every bidder has claimed and escrow is empty.
    ///
    /// Offered-asset dust left by truncating payouts goes to the beneficiary.
    /// Calling again after success is a no-op.
    pub fn destruct<L: AssetLedger + ?Sized>(&mut self, ledger: &mut L) -> Result<DestructReceipt> {
        match self.phase {
            Phase::Destructed => {
                return Ok(DestructReceipt {
                    dust_returned: U256::zero(),
                    torn_down: false,
                })
            }
            Phase::Finalized => {}
            _ => return Err(AuctionError::NotFinalized),
        }
        if self.claim_count != self.bid_count {
            return Err(AuctionError::NotAllBidsClaimed {
                claimed: self.claim_count,
                bids: self.bid_count,
            });
        }
        let balance = ledger.balance_of(&self.funding_token, &self.address);
        if !balance.is_zero() {
            return Err(AuctionError::ResidualEscrow { balance });
        }

        let dust = ledger.balance_of(&self.token, &self.address);
        if !dust.is_zero() {
            ledger.transfer(&self.token, &self.address, &self.beneficiary, dust)?;
        }

        self.bids.clear();
        self.phase = Phase::Destructed;
        info!(
            "auction {} destructed, {} dust returned to {}",
            short(&self.address),
            dust,
            short(&self.beneficiary)
        );

        Ok(DestructReceipt {
            dust_returned: dust,
            torn_down: true,
        })
    }
}
