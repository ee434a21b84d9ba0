//! Auction house
//!
//! The factory side of the engine. The house holds assets it wants to sell
//! for its reserve asset and launches at most one auction per asset every
//! cooldown period. Holdings of the reserve asset itself are not auctioned:
//! they are burned outright.

use std::collections::BTreeMap;

use log::{info, warn};

use crate::curve::DecaySchedule;
use crate::error::{AuctionError, Result};
use crate::ledger::{derive_address, short, Address, AssetLedger, ZERO_ADDRESS};
use crate::math::U256;
use crate::state::{Auction, AuctionParams, EscrowPolicy, LaunchGate};

/// Minimum spacing between two auctions of the same asset (30 days)
pub const AUCTION_COOLDOWN_SECS: u64 = 30 * 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HouseConfig {
    /// Ledger identity of the house
    pub address: Address,
    /// Platform reserve asset; bids are paid in it
    pub reserve_token: Address,
    pub cooldown_secs: u64,
    pub schedule: DecaySchedule,
    pub escrow_policy: EscrowPolicy,
}

impl HouseConfig {
    pub fn new(address: Address, reserve_token: Address) -> Self {
        Self {
            address,
            reserve_token,
            cooldown_secs: AUCTION_COOLDOWN_SECS,
            schedule: DecaySchedule::default(),
            escrow_policy: EscrowPolicy::Burn,
        }
    }
}

/// Result of asking the house to sell an asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// A started auction holding the full quantity
    Started(Auction),
    /// The asset was the reserve asset and the holding was burned
    Burned { amount: U256 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionHouse {
    config: HouseConfig,
    last_started: BTreeMap<Address, u64>,
    latest: BTreeMap<Address, Address>,
    launches: u64,
}

impl AuctionHouse {
    pub fn new(config: HouseConfig) -> Result<Self> {
        if config.reserve_token == ZERO_ADDRESS {
            return Err(AuctionError::InvalidToken);
        }
        config.schedule.validate()?;
        Ok(Self {
            config,
            last_started: BTreeMap::new(),
            latest: BTreeMap::new(),
            launches: 0,
        })
    }

    pub fn config(&self) -> &HouseConfig {
        &self.config
    }

    pub fn address(&self) -> &Address {
        &self.config.address
    }

    /// Start time of the most recent auction of `token`
    pub fn last_started(&self, token: &Address) -> Option<u64> {
        self.last_started.get(token).copied()
    }

    /// Address of the most recent auction of `token`
    pub fn latest_auction(&self, token: &Address) -> Option<&Address> {
        self.latest.get(token)
    }

    /// Put the house's whole holding of `token` up for auction.
    ///
    /// # Errors
    /// * `InvalidToken` for the zero address
    /// * `NothingToSell` when the house holds none of `token`
    /// * `TooSoonSinceLastAuction` inside the cooldown window; the reserve
    ///   asset burn shares the same window
    pub fn start_token_auction<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        token: &Address,
        now: u64,
    ) -> Result<Launch> {
        if *token == ZERO_ADDRESS {
            return Err(AuctionError::InvalidToken);
        }

        let house = self.config.address;
        if *token == self.config.reserve_token {
            if let Err(e) = self.check_launch(token, now) {
                warn!("burn of reserve asset rejected: {}", e);
                return Err(e);
            }
            let amount = ledger.balance_of(token, &house);
            if !amount.is_zero() {
                ledger.burn(token, &house, amount)?;
            }
            self.last_started.insert(*token, now);
            info!("burned {} of reserve asset held by {}", amount, short(&house));
            return Ok(Launch::Burned { amount });
        }

        let quantity = ledger.balance_of(token, &house);
        if quantity.is_zero() {
            return Err(AuctionError::NothingToSell);
        }

        let launches = self.launches + 1;
        let address = derive_address(
            b"dutch-auction/auction",
            &[&house, token, &launches.to_le_bytes()],
        );
        let mut auction = Auction::new(AuctionParams {
            address,
            token: *token,
            funding_token: self.config.reserve_token,
            sale_quantity: quantity,
            schedule: self.config.schedule,
            beneficiary: house,
            escrow_policy: self.config.escrow_policy,
        })?;

        if let Err(e) = auction.start(&*self, now) {
            warn!("launch of {} rejected: {}", short(token), e);
            return Err(e);
        }
        ledger.transfer(token, &house, &address, quantity)?;

        self.launches = launches;
        self.last_started.insert(*token, now);
        self.latest.insert(*token, address);
        info!(
            "house {} launched auction {} for {} of {}",
            short(&house),
            short(&address),
            quantity,
            short(token)
        );
        Ok(Launch::Started(auction))
    }
}

impl LaunchGate for AuctionHouse {
    fn check_launch(&self, token: &Address, now: u64) -> Result<()> {
        if let Some(last_started) = self.last_started(token) {
            let next_allowed = last_started.saturating_add(self.config.cooldown_secs);
            if now < next_allowed {
                return Err(AuctionError::TooSoonSinceLastAuction {
                    last_started,
                    next_allowed,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{label_address, MemoryLedger};
    use crate::math::{pow10, WAD};

    fn house() -> (AuctionHouse, MemoryLedger) {
        let config = HouseConfig::new(label_address("house"), label_address("CLNY"));
        (AuctionHouse::new(config).unwrap(), MemoryLedger::new())
    }

    fn started(launch: Launch) -> Auction {
        match launch {
            Launch::Started(auction) => auction,
            other => panic!("expected a started auction, got {:?}", other),
        }
    }

    #[test]
    fn test_launch_moves_holding_into_auction() {
        let (mut house, mut ledger) = house();
        let token = label_address("TKN");
        let quantity = pow10(36).unwrap() * U256::from(3u64);
        ledger.mint(&token, house.address(), quantity).unwrap();

        let auction = started(house.start_token_auction(&mut ledger, &token, 1_000).unwrap());
        assert_eq!(auction.sale_quantity(), quantity);
        assert_eq!(auction.floor_price(), U256::one());
        assert_eq!(auction.start_time(), Some(1_000));
        assert_eq!(auction.token(), &token);
        assert_eq!(auction.funding_token(), &label_address("CLNY"));
        assert_eq!(ledger.balance_of(&token, auction.address()), quantity);
        assert_eq!(ledger.balance_of(&token, house.address()), U256::zero());
        assert_eq!(house.last_started(&token), Some(1_000));
        assert_eq!(house.latest_auction(&token), Some(auction.address()));
    }

    #[test]
    fn test_small_quantity_floor() {
        let (mut house, mut ledger) = house();
        let token = label_address("SMALL");
        ledger.mint(&token, house.address(), WAD / U256::from(10u64)).unwrap();
        let auction = started(house.start_token_auction(&mut ledger, &token, 0).unwrap());
        assert_eq!(auction.floor_price(), U256::from(10u64));
    }

    #[test]
    fn test_zero_token_rejected() {
        let (mut house, mut ledger) = house();
        assert_eq!(
            house.start_token_auction(&mut ledger, &ZERO_ADDRESS, 0),
            Err(AuctionError::InvalidToken)
        );
    }

    #[test]
    fn test_nothing_to_sell() {
        let (mut house, mut ledger) = house();
        let token = label_address("EMPTY");
        assert_eq!(
            house.start_token_auction(&mut ledger, &token, 0),
            Err(AuctionError::NothingToSell)
        );
    }

    #[test]
    fn test_cooldown_enforced() {
        let (mut house, mut ledger) = house();
        let token = label_address("TKN");
        ledger.mint(&token, house.address(), WAD).unwrap();
        house.start_token_auction(&mut ledger, &token, 0).unwrap();

        ledger.mint(&token, house.address(), WAD).unwrap();
        let before = house.clone();
        let result = house.start_token_auction(&mut ledger, &token, AUCTION_COOLDOWN_SECS - 1);
        assert_eq!(
            result,
            Err(AuctionError::TooSoonSinceLastAuction {
                last_started: 0,
                next_allowed: AUCTION_COOLDOWN_SECS,
            })
        );
        assert_eq!(house, before);
        assert_eq!(ledger.balance_of(&token, house.address()), WAD);

        let second = started(
            house
                .start_token_auction(&mut ledger, &token, AUCTION_COOLDOWN_SECS)
                .unwrap(),
        );
        assert_eq!(second.start_time(), Some(AUCTION_COOLDOWN_SECS));
        assert_eq!(house.last_started(&token), Some(AUCTION_COOLDOWN_SECS));
    }

    #[test]
    fn test_cooldown_is_per_token() {
        let (mut house, mut ledger) = house();
        let a = label_address("A");
        let b = label_address("B");
        ledger.mint(&a, house.address(), WAD).unwrap();
        ledger.mint(&b, house.address(), WAD).unwrap();
        let first = started(house.start_token_auction(&mut ledger, &a, 0).unwrap());
        let second = started(house.start_token_auction(&mut ledger, &b, 0).unwrap());
        assert_ne!(first.address(), second.address());
    }

    #[test]
    fn test_reserve_asset_is_burned() {
        let (mut house, mut ledger) = house();
        let clny = label_address("CLNY");
        let holder = label_address("holder");
        ledger.mint(&clny, house.address(), WAD).unwrap();
        ledger.mint(&clny, &holder, WAD).unwrap();

        let launch = house.start_token_auction(&mut ledger, &clny, 0).unwrap();
        assert_eq!(launch, Launch::Burned { amount: WAD });
        assert_eq!(ledger.balance_of(&clny, house.address()), U256::zero());
        assert_eq!(ledger.total_supply(&clny), WAD);
        assert_eq!(house.last_started(&clny), Some(0));
        assert_eq!(house.latest_auction(&clny), None);
    }

    #[test]
    fn test_reserve_burn_observes_cooldown() {
        let (mut house, mut ledger) = house();
        let clny = label_address("CLNY");
        ledger.mint(&clny, house.address(), WAD).unwrap();
        house.start_token_auction(&mut ledger, &clny, 100).unwrap();

        ledger.mint(&clny, house.address(), WAD).unwrap();
        let before = house.clone();
        assert_eq!(
            house.start_token_auction(&mut ledger, &clny, 99 + AUCTION_COOLDOWN_SECS),
            Err(AuctionError::TooSoonSinceLastAuction {
                last_started: 100,
                next_allowed: 100 + AUCTION_COOLDOWN_SECS,
            })
        );
        assert_eq!(house, before);
        assert_eq!(ledger.balance_of(&clny, house.address()), WAD);

        let launch = house
            .start_token_auction(&mut ledger, &clny, 100 + AUCTION_COOLDOWN_SECS)
            .unwrap();
        assert_eq!(launch, Launch::Burned { amount: WAD });
        assert_eq!(house.last_started(&clny), Some(100 + AUCTION_COOLDOWN_SECS));
    }
}
