//! Claim settlement
//!
//! After finalize every bidder redeems `WAD * bid / final_price` of the
//! offered asset, truncated. Because `final_price` is biased one unit above
//! the raw clearing ratio, the sum of all payouts never exceeds the sale
//! quantity held by the auction.

use log::info;

use crate::error::{ArithmeticError, AuctionError, Result};
use crate::ledger::{short, Address, AssetLedger};
use crate::math::{self, U256, WAD};
use crate::state::{Auction, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimReceipt {
    /// Offered asset transferred to the bidder
    pub tokens: U256,
    /// Contribution that was settled by this claim
    pub settled_bid: U256,
}

impl ClaimReceipt {
    fn empty() -> Self {
        Self {
            tokens: U256::zero(),
            settled_bid: U256::zero(),
        }
    }
}

impl Auction {
    /// Offered asset `bidder` would receive if they claimed now.
    pub fn tokens_owed(&self, bidder: &Address) -> Result<U256> {
        let final_price = match (self.phase, self.final_price) {
            (Phase::Finalized, Some(p)) => p,
            (Phase::Destructed, _) => return Err(AuctionError::Destructed),
            _ => return Err(AuctionError::NotFinalized),
        };
        Ok(math::mul_div(WAD, self.outstanding(bidder), final_price)?)
    }

    /// Redeem `bidder`'s outstanding contribution at the uniform price.
    ///
    /// A bidder with nothing outstanding (never bid, or already claimed)
    /// gets an empty receipt and `claim_count` is left alone.
    pub fn claim<L: AssetLedger + ?Sized>(&mut self, ledger: &mut L, bidder: &Address) -> Result<ClaimReceipt> {
        match self.phase {
            Phase::Finalized => {}
            Phase::Destructed => return Err(AuctionError::Destructed),
            _ => return Err(AuctionError::NotFinalized),
        }

        let bid = self.outstanding(bidder);
        if bid.is_zero() {
            return Ok(ClaimReceipt::empty());
        }

        let tokens = self.tokens_owed(bidder)?;
        let settled_total = math::add(self.settled_total, bid)?;
        let claim_count = self
            .claim_count
            .checked_add(1)
            .ok_or(AuctionError::Arithmetic(ArithmeticError::Overflow))?;

        if !tokens.is_zero() {
            ledger.transfer(&self.token, &self.address, bidder, tokens)?;
        }

        self.bids.insert(*bidder, U256::zero());
        self.settled_total = settled_total;
        self.claim_count = claim_count;
        info!(
            "claim by {}: {} tokens for bid {} ({} of {} claimed)",
            short(bidder),
            tokens,
            bid,
            claim_count,
            self.bid_count
        );

        Ok(ClaimReceipt {
            tokens,
            settled_bid: bid,
        })
    }
}
