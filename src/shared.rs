//! Thread-safe auction handle
//!
//! [`SharedAuction`] serializes every mutating operation on one auction
//! behind a write lock and reads time from a [`Clock`]. Lock order is
//! always auction first, then ledger. Price queries only take the read lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use crate::bids::BidReceipt;
use crate::claims::ClaimReceipt;
use crate::error::Result;
use crate::ledger::{Address, AssetLedger};
use crate::math::U256;
use crate::state::{Auction, AuctionSnapshot, DestructReceipt, FinalizeReceipt, LaunchGate};

// ============================================================================
// Clocks
// ============================================================================

/// Source of the current time in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock (UTC unix seconds)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Manually driven clock for tests and simulation
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            secs: AtomicU64::new(start),
        }
    }

    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) -> u64 {
        let prev = self.secs.fetch_add(secs, Ordering::SeqCst);
        prev.saturating_add(secs)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.secs.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

// ============================================================================
// Shared handle
// ============================================================================

pub struct SharedAuction<L, C> {
    auction: RwLock<Auction>,
    ledger: Arc<Mutex<L>>,
    clock: C,
    /// Latest time handed out; reads never go below it
    high_water: AtomicU64,
}

impl<L: AssetLedger + Send, C: Clock> SharedAuction<L, C> {
    pub fn new(auction: Auction, ledger: Arc<Mutex<L>>, clock: C) -> Self {
        Self {
            auction: RwLock::new(auction),
            ledger,
            clock,
            high_water: AtomicU64::new(0),
        }
    }

    /// Current time, clamped so that it never runs backwards.
    pub fn now(&self) -> u64 {
        let t = self.clock.now();
        let prev = self.high_water.fetch_max(t, Ordering::SeqCst);
        prev.max(t)
    }

    pub fn ledger(&self) -> Arc<Mutex<L>> {
        Arc::clone(&self.ledger)
    }

    pub fn start<G: LaunchGate + ?Sized>(&self, gate: &G) -> Result<()> {
        let mut auction = self.auction.write();
        let now = self.now();
        auction.start(gate, now)
    }

    pub fn bid(&self, bidder: &Address, amount: U256) -> Result<BidReceipt> {
        let mut auction = self.auction.write();
        let now = self.now();
        let mut ledger = self.ledger.lock();
        auction.bid(&mut *ledger, bidder, amount, now)
    }

    pub fn finalize(&self) -> Result<FinalizeReceipt> {
        let mut auction = self.auction.write();
        let now = self.now();
        let mut ledger = self.ledger.lock();
        auction.finalize(&mut *ledger, now)
    }

    pub fn claim(&self, bidder: &Address) -> Result<ClaimReceipt> {
        let mut auction = self.auction.write();
        let mut ledger = self.ledger.lock();
        auction.claim(&mut *ledger, bidder)
    }

    pub fn destruct(&self) -> Result<DestructReceipt> {
        let mut auction = self.auction.write();
        let mut ledger = self.ledger.lock();
        auction.destruct(&mut *ledger)
    }

    pub fn price(&self) -> Result<U256> {
        let auction = self.auction.read();
        auction.price(self.now())
    }

    pub fn total_to_end_auction(&self) -> Result<U256> {
        let auction = self.auction.read();
        auction.total_to_end_auction(self.now())
    }

    pub fn snapshot(&self) -> AuctionSnapshot {
        self.auction.read().snapshot()
    }

    /// Run a read-only closure against the auction.
    pub fn with_auction<R>(&self, f: impl FnOnce(&Auction) -> R) -> R {
        f(&self.auction.read())
    }

    pub fn into_inner(self) -> Auction {
        self.auction.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::DecaySchedule;
    use crate::error::AuctionError;
    use crate::ledger::{label_address, MemoryLedger};
    use crate::math::WAD;
    use crate::state::{AuctionParams, EscrowPolicy, OpenGate, Phase};

    fn shared(clock: Arc<ManualClock>) -> SharedAuction<MemoryLedger, Arc<ManualClock>> {
        let auction = Auction::new(AuctionParams {
            address: label_address("auction"),
            token: label_address("TKN"),
            funding_token: label_address("FUND"),
            sale_quantity: WAD,
            schedule: DecaySchedule::default(),
            beneficiary: label_address("house"),
            escrow_policy: EscrowPolicy::Burn,
        })
        .unwrap();
        let mut ledger = MemoryLedger::new();
        ledger.mint(auction.token(), auction.address(), WAD).unwrap();
        SharedAuction::new(auction, Arc::new(Mutex::new(ledger)), clock)
    }

    #[test]
    fn test_clock_never_runs_backwards() {
        let clock = Arc::new(ManualClock::new(1_000));
        let handle = shared(Arc::clone(&clock));
        assert_eq!(handle.now(), 1_000);
        clock.set(900);
        assert_eq!(handle.now(), 1_000);
        assert_eq!(clock.advance(500), 1_400);
        assert_eq!(handle.now(), 1_400);
    }

    #[test]
    fn test_lifecycle_through_handle() {
        let clock = Arc::new(ManualClock::new(0));
        let handle = shared(Arc::clone(&clock));
        handle.start(&OpenGate).unwrap();

        clock.set(30 * 86_400);
        let cap = handle.total_to_end_auction().unwrap();
        assert_eq!(cap, U256::from(1_000_000u64));

        let alice = label_address("alice");
        {
            let ledger = handle.ledger();
            let mut ledger = ledger.lock();
            ledger.mint(&label_address("FUND"), &alice, cap).unwrap();
            ledger.approve(&label_address("FUND"), &alice, &label_address("auction"), cap);
        }
        assert!(handle.bid(&alice, cap).unwrap().closed);
        assert_eq!(handle.snapshot().phase, Phase::Closed);

        handle.finalize().unwrap();
        assert!(handle.claim(&alice).unwrap().tokens > U256::zero());
        assert!(handle.destruct().unwrap().torn_down);
        assert_eq!(handle.bid(&alice, U256::one()), Err(AuctionError::Destructed));
        assert!(handle.with_auction(|a| a.destructed()));
    }
}
