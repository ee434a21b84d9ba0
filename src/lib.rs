//! Descending-price auction settlement engine
//!
//! A single offered asset is sold for a funding asset at a price that only
//! ever falls with time. Bidders contribute against a hard raise cap (the
//! cost of the whole sale at the current price); the bid that crosses the
//! cap is partially filled and closes the auction. Finalize fixes one
//! uniform clearing price, and every bidder then redeems exactly once at
//! that price.
//!
//! Guarantees:
//! 1. Price is non-increasing in elapsed time and never below the floor
//! 2. The raised total never exceeds the cap at the moment it is crossed
//! 3. Escrow always equals the sum of outstanding contributions until finalize
//! 4. Payouts never exceed the sale quantity
//! 5. A failed operation leaves the auction exactly as it was
//!
//! All amounts are 256-bit and every arithmetic step is checked.

#![forbid(unsafe_code)]

pub mod bids;
pub mod claims;
pub mod curve;
pub mod error;
pub mod house;
pub mod ledger;
pub mod math;
pub mod shared;
pub mod state;

pub use bids::BidReceipt;
pub use claims::ClaimReceipt;
pub use curve::{floor_price, DecaySchedule, PriceCurve};
pub use error::{ArithmeticError, AuctionError, LedgerError, Result};
pub use house::{AuctionHouse, HouseConfig, Launch, AUCTION_COOLDOWN_SECS};
pub use ledger::{derive_address, label_address, Address, AssetLedger, MemoryLedger, ZERO_ADDRESS};
pub use math::{add_int, can_add, can_mul, can_sub, mul_int, sub_int, I256, U256, WAD};
pub use shared::{Clock, ManualClock, SharedAuction, SystemClock};
pub use state::{
    Auction, AuctionParams, AuctionSnapshot, DestructReceipt, EscrowPolicy, FinalizeReceipt,
    LaunchGate, OpenGate, Phase,
};
