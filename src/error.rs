//! Error types for the auction engine

use thiserror::Error;

use crate::math::U256;

/// Checked arithmetic failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// Failures reported by an asset ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("insufficient allowance: need {required}, approved {approved}")]
    InsufficientAllowance { required: U256, approved: U256 },

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

/// Errors that can occur while running an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuctionError {
    /// Offered asset is the zero address
    #[error("invalid token")]
    InvalidToken,

    /// The house holds none of the offered asset
    #[error("nothing to sell")]
    NothingToSell,

    #[error("sale quantity must be positive")]
    InvalidQuantity,

    #[error("invalid decay schedule")]
    InvalidSchedule,

    #[error("auction start too soon: last started at {last_started}, next allowed at {next_allowed}")]
    TooSoonSinceLastAuction { last_started: u64, next_allowed: u64 },

    #[error("auction already started")]
    AlreadyStarted,

    #[error("auction not started")]
    NotStarted,

    /// Zero-amount bid
    #[error("invalid bid")]
    InvalidBid,

    /// Cap reached or auction finalized
    #[error("auction closed")]
    AuctionClosed,

    #[error("auction not closed")]
    AuctionNotClosed,

    #[error("auction already finalized")]
    AlreadyFinalized,

    #[error("auction not finalized")]
    NotFinalized,

    #[error("not all bids claimed: {claimed} of {bids}")]
    NotAllBidsClaimed { claimed: u64, bids: u64 },

    /// Funding asset still held by the auction at teardown
    #[error("residual escrow balance: {balance}")]
    ResidualEscrow { balance: U256 },

    #[error("auction destructed")]
    Destructed,

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = core::result::Result<T, AuctionError>;
