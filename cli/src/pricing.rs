//! Price curve inspection

use anyhow::{Context, Result};
use colored::Colorize;
use dutch_auction::{DecaySchedule, PriceCurve, U256};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Serialize)]
pub struct Row {
    pub elapsed: u64,
    #[serde(serialize_with = "as_decimal")]
    pub price: U256,
    #[serde(serialize_with = "as_decimal")]
    pub cap: U256,
}

fn as_decimal<S: Serializer>(v: &U256, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(v)
}

/// Compact scientific rendering for very large amounts (`9.8958e35`).
pub fn sci(v: U256) -> String {
    let digits = v.to_string();
    if digits.len() <= 6 {
        return digits;
    }
    let (head, tail) = digits.split_at(1);
    let frac = tail[..4].trim_end_matches('0');
    if frac.is_empty() {
        format!("{}e{}", head, tail.len())
    } else {
        format!("{}.{}e{}", head, frac, tail.len())
    }
}

/// Price and cap every `step` seconds from 0 through `until` inclusive.
pub fn schedule_rows(curve: &PriceCurve, until: u64, step: u64) -> Result<Vec<Row>> {
    let step = step.max(1);
    let mut rows = Vec::new();
    let mut t = 0u64;
    loop {
        rows.push(Row {
            elapsed: t,
            price: curve.price(t)?,
            cap: curve.total_to_end_auction(t)?,
        });
        if t >= until {
            break;
        }
        t = t.saturating_add(step).min(until);
    }
    Ok(rows)
}

pub fn show_price(quantity: U256, elapsed: u64, schedule: DecaySchedule) -> Result<()> {
    let curve = PriceCurve::new(quantity, schedule).context("Invalid curve parameters")?;
    let price = curve.price(elapsed)?;
    let cap = curve.total_to_end_auction(elapsed)?;

    println!("{}", "=== Auction Price ===".bright_green().bold());
    println!("{} {} ({})", "Sale quantity:".bright_cyan(), quantity, sci(quantity));
    println!("{} {}", "Floor price:".bright_cyan(), curve.floor_price());
    println!("{} {}s", "Elapsed:".bright_cyan(), elapsed);
    println!("{} {} ({})", "Price:".bright_cyan(), price, sci(price));
    println!("{} {} ({})", "Cap:".bright_cyan(), cap, sci(cap));
    Ok(())
}

pub fn show_schedule(
    quantity: U256,
    until: u64,
    step: u64,
    schedule: DecaySchedule,
    json: bool,
) -> Result<()> {
    let curve = PriceCurve::new(quantity, schedule).context("Invalid curve parameters")?;
    let rows = schedule_rows(&curve, until, step)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", "=== Price Schedule ===".bright_green().bold());
    println!(
        "{} {}  {} {}",
        "Sale quantity:".bright_cyan(),
        sci(quantity),
        "Floor:".bright_cyan(),
        curve.floor_price()
    );
    println!("\n  {:>10}  {:>12}  {:>12}", "elapsed".dimmed(), "price".dimmed(), "cap".dimmed());
    for row in &rows {
        println!("  {:>10}  {:>12}  {:>12}", row.elapsed, sci(row.price), sci(row.cap));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dutch_auction::WAD;

    #[test]
    fn test_sci_rendering() {
        assert_eq!(sci(U256::from(123u64)), "123");
        assert_eq!(sci(U256::from(10u64).pow(U256::from(35u64))), "1e35");
        assert_eq!(sci(U256::from(2_500_000u64)), "2.5e6");
        assert_eq!(sci(U256::from(9_895_833u64)), "9.8958e6");
    }

    #[test]
    fn test_schedule_rows_cover_range() {
        let curve = PriceCurve::with_default_schedule(WAD).unwrap();
        let rows = schedule_rows(&curve, 86_400 * 2, 86_400).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].elapsed, 0);
        assert_eq!(rows[2].elapsed, 172_800);
        assert_eq!(rows[1].price, U256::from(10u64).pow(U256::from(35u64)));
        // One whole token: cap equals price
        assert_eq!(rows[1].cap, rows[1].price);
    }

    #[test]
    fn test_rows_serialize_as_decimal_strings() {
        let curve = PriceCurve::with_default_schedule(WAD).unwrap();
        let rows = schedule_rows(&curve, 0, 1).unwrap();
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json[0]["price"], format!("1{}", "0".repeat(36)));
        assert_eq!(json[0]["elapsed"], 0);
    }

    #[test]
    fn test_schedule_rows_clamps_last_step() {
        let curve = PriceCurve::with_default_schedule(WAD).unwrap();
        let rows = schedule_rows(&curve, 100, 30).unwrap();
        let elapsed: Vec<u64> = rows.iter().map(|r| r.elapsed).collect();
        assert_eq!(elapsed, vec![0, 30, 60, 90, 100]);
    }
}
