//! Bid intake
//!
//! Contributions are accepted against the live cap
//! (`total_to_end_auction` at the moment of the bid). The bid that crosses
//! the cap is partially filled: only the room left under the cap is pulled
//! from the bidder, the rest is never debited.

use log::{debug, info};

use crate::error::{ArithmeticError, AuctionError, Result};
use crate::ledger::{short, Address, AssetLedger};
use crate::math::{self, U256};
use crate::state::{Auction, Phase};

/// Outcome of an accepted bid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidReceipt {
    /// Amount actually pulled into escrow (`<=` requested)
    pub accepted: U256,
    /// Unit price the cap was computed at
    pub price: U256,
    pub received_total: U256,
    /// This bid reached the cap
    pub closed: bool,
}

impl Auction {
    /// Contribute up to `amount` of the funding asset.
    ///
    /// The bidder must have approved the auction address on the ledger for
    /// at least the accepted amount.
    ///
    /// # Errors
    /// * `InvalidBid` for a zero amount or a bid from the auction's own address
    /// * `NotStarted` before start
    /// * `AuctionClosed` once the cap is reached, after finalize, or when no
    ///   room is left under the cap
    /// * ledger errors if the pull fails; nothing is recorded in that case
    pub fn bid<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        bidder: &Address,
        amount: U256,
        now: u64,
    ) -> Result<BidReceipt> {
        match self.phase {
            Phase::Started => {}
            Phase::Created => return Err(AuctionError::NotStarted),
            Phase::Closed | Phase::Finalized => return Err(AuctionError::AuctionClosed),
            Phase::Destructed => return Err(AuctionError::Destructed),
        }
        if amount.is_zero() || *bidder == self.address {
            return Err(AuctionError::InvalidBid);
        }

        let price = self.price(now)?;
        let cap = self.total_to_end_auction(now)?;
        // The cap decays with the price; once it is at or below what has
        // already been raised there is no room left.
        let room = cap.saturating_sub(self.received_total);
        let accepted = amount.min(room);
        if accepted.is_zero() {
            return Err(AuctionError::AuctionClosed);
        }

        let previous = self.outstanding(bidder);
        let outstanding = math::add(previous, accepted)?;
        let received_total = math::add(self.received_total, accepted)?;
        let bid_count = if !self.bids.contains_key(bidder) {
            self.bid_count
                .checked_add(1)
                .ok_or(AuctionError::Arithmetic(ArithmeticError::Overflow))?
        } else {
            self.bid_count
        };

        ledger.transfer_from(&self.funding_token, &self.address, bidder, &self.address, accepted)?;

        self.bids.insert(*bidder, outstanding);
        self.received_total = received_total;
        self.bid_count = bid_count;

        let closed = received_total == cap;
        if closed {
            self.end_time = Some(now);
            self.phase = Phase::Closed;
            info!(
                "auction {} closed at {}: raised {} at price {}",
                short(&self.address),
                now,
                received_total,
                price
            );
        }
        debug!(
            "bid from {}: requested {} accepted {} (total {} / cap {})",
            short(bidder),
            amount,
            accepted,
            received_total,
            cap
        );

        Ok(BidReceipt {
            accepted,
            price,
            received_total,
            closed,
        })
    }

    /// Outstanding contribution of `bidder` (zero after claim or if none).
    pub fn outstanding(&self, bidder: &Address) -> U256 {
        self.bids.get(bidder).copied().unwrap_or_default()
    }

    /// Every bidder with their outstanding contribution
    pub fn bids(&self) -> impl Iterator<Item = (&Address, &U256)> {
        self.bids.iter()
    }

    /// Sum of all outstanding contributions
    pub fn outstanding_total(&self) -> Result<U256> {
        self.bids
            .values()
            .try_fold(U256::zero(), |acc, v| math::add(acc, *v))
            .map_err(AuctionError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::DecaySchedule;
    use crate::ledger::{label_address, MemoryLedger};
    use crate::math::WAD;
    use crate::state::{AuctionParams, EscrowPolicy, OpenGate};

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    fn setup(quantity: U256) -> (Auction, MemoryLedger) {
        let mut auction = Auction::new(AuctionParams {
            address: label_address("auction"),
            token: label_address("TKN"),
            funding_token: label_address("FUND"),
            sale_quantity: quantity,
            schedule: DecaySchedule::default(),
            beneficiary: label_address("house"),
            escrow_policy: EscrowPolicy::Burn,
        })
        .unwrap();
        auction.start(&OpenGate, 0).unwrap();
        (auction, MemoryLedger::new())
    }

    fn fund(ledger: &mut MemoryLedger, auction: &Auction, who: &Address, amount: U256) {
        ledger.mint(auction.funding_token(), who, amount).unwrap();
        ledger.approve(auction.funding_token(), who, auction.address(), amount);
    }

    #[test]
    fn test_bid_escrows_funds() {
        let (mut auction, mut ledger) = setup(WAD * u(3));
        let alice = label_address("alice");
        fund(&mut ledger, &auction, &alice, WAD);

        let receipt = auction.bid(&mut ledger, &alice, WAD, 10).unwrap();
        assert_eq!(receipt.accepted, WAD);
        assert!(!receipt.closed);
        assert_eq!(auction.outstanding(&alice), WAD);
        assert_eq!(auction.bid_count(), 1);
        assert_eq!(ledger.balance_of(auction.funding_token(), auction.address()), WAD);
        assert_eq!(auction.escrow_drift(&ledger).unwrap(), crate::math::I256::ZERO);
    }

    #[test]
    fn test_zero_bid_rejected() {
        let (mut auction, mut ledger) = setup(WAD);
        let alice = label_address("alice");
        assert_eq!(
            auction.bid(&mut ledger, &alice, U256::zero(), 1),
            Err(AuctionError::InvalidBid)
        );
    }

    #[test]
    fn test_bid_from_auction_address_rejected() {
        let (mut auction, mut ledger) = setup(WAD);
        let own = *auction.address();
        fund(&mut ledger, &auction, &own, u(1_000));

        let before = auction.clone();
        assert_eq!(auction.bid(&mut ledger, &own, u(500), 1), Err(AuctionError::InvalidBid));
        assert_eq!(auction, before);
        assert_eq!(ledger.allowance(auction.funding_token(), &own, &own), u(1_000));
        assert_eq!(auction.received_total(), U256::zero());
    }

    #[test]
    fn test_bid_before_start_rejected() {
        let (mut auction, mut ledger) = setup(WAD);
        auction.phase = Phase::Created;
        auction.start_time = None;
        let alice = label_address("alice");
        assert_eq!(auction.bid(&mut ledger, &alice, u(1), 1), Err(AuctionError::NotStarted));
    }

    #[test]
    fn test_failed_pull_records_nothing() {
        let (mut auction, mut ledger) = setup(WAD);
        let alice = label_address("alice");
        ledger.mint(auction.funding_token(), &alice, u(100)).unwrap();
        // No approval
        let before = auction.clone();
        let result = auction.bid(&mut ledger, &alice, u(50), 1);
        assert!(matches!(result, Err(AuctionError::Ledger(_))));
        assert_eq!(auction, before);
    }

    #[test]
    fn test_cap_decayed_below_total_rejects() {
        let (mut auction, mut ledger) = setup(WAD);
        let alice = label_address("alice");
        // Cap for 1 token at day 30 is 10^6
        let at = 30 * 86_400;
        let cap = auction.total_to_end_auction(at).unwrap();
        assert_eq!(cap, u(1_000_000));
        fund(&mut ledger, &auction, &alice, cap);
        auction.bid(&mut ledger, &alice, cap - u(1), at).unwrap();

        // A day later the cap is ten times smaller than what was raised
        let result = auction.bid(&mut ledger, &alice, u(1), at + 86_400);
        assert_eq!(result, Err(AuctionError::AuctionClosed));
        assert_eq!(auction.phase(), Phase::Started);
    }

    #[test]
    fn test_outstanding_total_matches_received() {
        let (mut auction, mut ledger) = setup(WAD * u(5));
        for name in ["a", "b", "c"] {
            let who = label_address(name);
            fund(&mut ledger, &auction, &who, u(1_000));
            auction.bid(&mut ledger, &who, u(700), 3).unwrap();
        }
        assert_eq!(auction.outstanding_total().unwrap(), u(2_100));
        assert_eq!(auction.received_total(), u(2_100));
        assert_eq!(auction.bids().count(), 3);
    }
}
