//! Scripted auction simulation
//!
//! Runs a [`Scenario`] end to end against an in-memory ledger: the house
//! launches the auction, participants are funded and approve it, then the
//! steps drive a [`SharedAuction`] on a manual clock. Rejected steps are
//! recorded and the script continues.

use anyhow::{bail, Context, Result};
use dutch_auction::ledger::short;
use dutch_auction::{
    label_address, AssetLedger, AuctionError, AuctionHouse, HouseConfig, Launch, ManualClock,
    MemoryLedger, SharedAuction,
};
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::{parse_amount, Scenario, Step};
use crate::report::{Balance, Report, StepRecord, Summary};

type Handle = SharedAuction<MemoryLedger, Arc<ManualClock>>;

pub fn run(scenario: &Scenario) -> Result<Report> {
    let cfg = &scenario.auction;
    let token = label_address(&cfg.token);
    let reserve = label_address(&cfg.reserve);
    let house_addr = label_address(&cfg.house);
    let quantity = parse_amount(&cfg.quantity)?;

    let mut ledger = MemoryLedger::new();
    ledger.mint(&token, &house_addr, quantity)?;
    for p in &scenario.participants {
        ledger.mint(&reserve, &label_address(&p.name), parse_amount(&p.balance)?)?;
    }

    let mut house_config = HouseConfig::new(house_addr, reserve);
    house_config.escrow_policy = cfg.escrow.policy();
    if let Some(schedule) = &cfg.schedule {
        house_config.schedule = schedule.resolve();
    }
    let mut house = AuctionHouse::new(house_config).context("Invalid house configuration")?;

    let auction = match house
        .start_token_auction(&mut ledger, &token, cfg.start)
        .context("Failed to launch auction")?
    {
        Launch::Started(auction) => auction,
        Launch::Burned { amount } => {
            bail!("{} is the reserve asset: {} burned, nothing auctioned", cfg.token, amount)
        }
    };
    for p in &scenario.participants {
        let who = label_address(&p.name);
        let balance = ledger.balance_of(&reserve, &who);
        ledger.approve(&reserve, &who, auction.address(), balance);
    }
    let address = *auction.address();

    let clock = Arc::new(ManualClock::new(cfg.start));
    let handle: Handle = SharedAuction::new(auction, Arc::new(Mutex::new(ledger)), Arc::clone(&clock));

    let mut records = Vec::new();
    for step in &scenario.steps {
        run_step(scenario, &handle, &clock, step, &mut records)?;
    }

    let drift = {
        let ledger = handle.ledger();
        handle.with_auction(|a| a.escrow_drift(&*ledger.lock()))?
    };
    let summary = Summary::from_snapshot(&handle.snapshot(), drift);

    let ledger = handle.ledger();
    let ledger = ledger.lock();
    let mut balances: Vec<Balance> = scenario
        .participants
        .iter()
        .map(|p| {
            let who = label_address(&p.name);
            Balance {
                name: p.name.clone(),
                reserve: ledger.balance_of(&reserve, &who).to_string(),
                token: ledger.balance_of(&token, &who).to_string(),
            }
        })
        .collect();
    balances.push(Balance {
        name: cfg.house.clone(),
        reserve: ledger.balance_of(&reserve, &house_addr).to_string(),
        token: ledger.balance_of(&token, &house_addr).to_string(),
    });

    Ok(Report {
        auction: short(&address),
        token: cfg.token.clone(),
        reserve: cfg.reserve.clone(),
        steps: records,
        summary,
        balances,
        reserve_supply: ledger.total_supply(&reserve).to_string(),
    })
}

fn run_step(
    scenario: &Scenario,
    handle: &Handle,
    clock: &ManualClock,
    step: &Step,
    records: &mut Vec<StepRecord>,
) -> Result<()> {
    let mut record = |action: String, outcome: std::result::Result<String, AuctionError>| {
        let at = handle.now();
        let index = records.len() + 1;
        match &outcome {
            Ok(detail) => debug!("step {} {} at {}: {}", index, action, at, detail),
            Err(e) => warn!("step {} {} at {} rejected: {}", index, action, at, e),
        }
        records.push(StepRecord::new(index, at, action, outcome));
    };

    match step {
        Step::Advance { secs } => {
            let now = clock.advance(*secs);
            record(format!("advance {}s", secs), Ok(format!("now {}", now)));
        }
        Step::Bid { who, amount } => {
            let amount = parse_amount(amount)?;
            let outcome = handle.bid(&label_address(who), amount).map(|r| {
                format!(
                    "accepted {} at price {}, raised {}{}",
                    r.accepted,
                    r.price,
                    r.received_total,
                    if r.closed { " (cap reached)" } else { "" }
                )
            });
            record(format!("bid {} {}", who, amount), outcome);
        }
        Step::Finalize => {
            let outcome = handle.finalize().map(|r| {
                format!(
                    "final price {}, raised {}, escrow disposed {}",
                    r.final_price, r.received_total, r.escrow_disposed
                )
            });
            record("finalize".to_string(), outcome);
        }
        Step::Claim { who } => {
            let outcome = claim(handle, who);
            record(format!("claim {}", who), outcome);
        }
        Step::ClaimAll => {
            for p in &scenario.participants {
                let outcome = claim(handle, &p.name);
                record(format!("claim {}", p.name), outcome);
            }
        }
        Step::Destruct => {
            let outcome = handle.destruct().map(|r| {
                if r.torn_down {
                    format!("torn down, {} dust returned", r.dust_returned)
                } else {
                    "already torn down".to_string()
                }
            });
            record("destruct".to_string(), outcome);
        }
        Step::Price => {
            let outcome = handle
                .price()
                .and_then(|p| Ok(format!("price {}, cap {}", p, handle.total_to_end_auction()?)));
            record("price".to_string(), outcome);
        }
    }
    Ok(())
}

fn claim(handle: &Handle, who: &str) -> std::result::Result<String, AuctionError> {
    handle
        .claim(&label_address(who))
        .map(|r| format!("{} tokens for bid {}", r.tokens, r.settled_bid))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLD_OUT: &str = r#"
        [auction]
        token = "TKN"
        quantity = "1e18"

        [[participants]]
        name = "alice"
        balance = "2_000_000"

        [[participants]]
        name = "bob"
        balance = "2_000_000"

        [[steps]]
        action = "advance"
        secs = 2592000

        [[steps]]
        action = "bid"
        who = "alice"
        amount = "400_000"

        [[steps]]
        action = "bid"
        who = "bob"
        amount = "2_000_000"

        [[steps]]
        action = "bid"
        who = "alice"
        amount = "1"

        [[steps]]
        action = "finalize"

        [[steps]]
        action = "claim_all"

        [[steps]]
        action = "destruct"
    "#;

    #[test]
    fn test_sold_out_scenario() {
        let scenario = Scenario::parse(SOLD_OUT).unwrap();
        let report = run(&scenario).unwrap();

        // Third bid arrives after the cap was reached
        let rejected: Vec<_> = report.steps.iter().filter(|s| !s.ok).collect();
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].action.starts_with("bid alice"));
        assert_eq!(rejected[0].detail, "auction closed");

        assert_eq!(report.summary.phase, "destructed");
        assert_eq!(report.summary.received_total, "1000000");
        assert_eq!(report.summary.final_price.as_deref(), Some("1000001"));
        assert_eq!(report.summary.bid_count, 2);
        assert_eq!(report.summary.claim_count, 2);
        assert_eq!(report.summary.escrow_drift, "0");

        // Bob was only debited the remaining room
        let bob = report.balances.iter().find(|b| b.name == "bob").unwrap();
        assert_eq!(bob.reserve, "1400000");
        // Escrow was burned at finalize
        assert_eq!(report.reserve_supply, "3000000");
    }

    #[test]
    fn test_bundled_colony_scenario() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../scenarios/colony.toml");
        let report = run(&Scenario::load(&path).unwrap()).unwrap();

        // Only the early finalize is refused
        let rejected: Vec<_> = report.steps.iter().filter(|s| !s.ok).map(|s| s.action.as_str()).collect();
        assert_eq!(rejected, vec!["finalize"]);
        assert_eq!(report.summary.phase, "destructed");
        assert_eq!(report.summary.received_total, "3000000000000000000000000000000000");
        assert_eq!(report.summary.final_price.as_deref(), Some("1000000000000001"));

        // Carol was only debited what fit under the cap
        let carol = report.balances.iter().find(|b| b.name == "carol").unwrap();
        assert_eq!(carol.reserve, "100000000000000000000000000000000");
    }

    #[test]
    fn test_reserve_token_is_not_auctioned() {
        let scenario = Scenario::parse(
            r#"
            [auction]
            token = "CLNY"
            quantity = "10"
            "#,
        )
        .unwrap();
        let err = run(&scenario).unwrap_err();
        assert!(err.to_string().contains("reserve asset"));
    }
}
