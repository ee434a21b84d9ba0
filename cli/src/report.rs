//! Simulation report rendering

use colored::Colorize;
use dutch_auction::{AuctionError, AuctionSnapshot, I256};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub at: u64,
    pub action: String,
    pub ok: bool,
    pub detail: String,
}

impl StepRecord {
    pub fn new(index: usize, at: u64, action: String, outcome: Result<String, AuctionError>) -> Self {
        let (ok, detail) = match outcome {
            Ok(detail) => (true, detail),
            Err(e) => (false, e.to_string()),
        };
        Self {
            index,
            at,
            action,
            ok,
            detail,
        }
    }
}

/// Final auction state. Amounts are decimal strings.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub phase: String,
    pub sale_quantity: String,
    pub floor_price: String,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub received_total: String,
    pub settled_total: String,
    pub final_price: Option<String>,
    pub bid_count: u64,
    pub claim_count: u64,
    /// Escrow held minus escrow expected
    pub escrow_drift: String,
}

impl Summary {
    pub fn from_snapshot(s: &AuctionSnapshot, drift: I256) -> Self {
        Self {
            phase: s.phase.as_str().to_string(),
            sale_quantity: s.sale_quantity.to_string(),
            floor_price: s.floor_price.to_string(),
            start_time: s.start_time,
            end_time: s.end_time,
            received_total: s.received_total.to_string(),
            settled_total: s.settled_total.to_string(),
            final_price: s.final_price.map(|p| p.to_string()),
            bid_count: s.bid_count,
            claim_count: s.claim_count,
            escrow_drift: drift.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Balance {
    pub name: String,
    pub reserve: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub auction: String,
    pub token: String,
    pub reserve: String,
    pub steps: Vec<StepRecord>,
    pub summary: Summary,
    pub balances: Vec<Balance>,
    pub reserve_supply: String,
}

impl Report {
    pub fn print(&self) {
        println!("{}", "=== Auction Simulation ===".bright_green().bold());
        println!("{} {}", "Auction:".bright_cyan(), self.auction);
        println!("{} {} for {}", "Selling:".bright_cyan(), self.token, self.reserve);

        println!("\n{}", "Steps:".bright_yellow());
        for step in &self.steps {
            let mark = if step.ok { "✓".bright_green() } else { "✗".bright_red() };
            println!(
                "  {} {:>3} {} {} {}",
                mark,
                step.index,
                format!("t={}", step.at).dimmed(),
                step.action,
                step.detail.dimmed()
            );
        }

        let s = &self.summary;
        println!("\n{}", "Result:".bright_yellow());
        println!("  {} {}", "Phase:".bright_cyan(), s.phase);
        println!("  {} {}", "Sale quantity:".bright_cyan(), s.sale_quantity);
        println!("  {} {}", "Floor price:".bright_cyan(), s.floor_price);
        println!("  {} {}", "Raised:".bright_cyan(), s.received_total);
        println!(
            "  {} {}",
            "Final price:".bright_cyan(),
            s.final_price.as_deref().unwrap_or("-")
        );
        println!("  {} {} / {}", "Claims:".bright_cyan(), s.claim_count, s.bid_count);
        if s.escrow_drift == "0" {
            println!("  {} Escrow balanced", "✓".green());
        } else {
            println!("  {} Escrow drift {}", "⚠️".yellow(), s.escrow_drift);
        }

        println!("\n{}", "Balances:".bright_yellow());
        for b in &self.balances {
            println!(
                "  {:<12} {} {}  {} {}",
                b.name,
                "reserve".dimmed(),
                b.reserve,
                "token".dimmed(),
                b.token
            );
        }
        println!("  {} {}", "Reserve supply:".bright_cyan(), self.reserve_supply);
    }
}
