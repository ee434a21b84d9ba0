//! Scenario configuration
//!
//! A scenario is a TOML file describing one auction launched by a house,
//! the funded participants and a script of steps to run against it.
//!
//! ```toml
//! [auction]
//! token = "TKN"
//! reserve = "CLNY"
//! quantity = "3e36"
//!
//! [[participants]]
//! name = "alice"
//! balance = "1e54"
//!
//! [[steps]]
//! action = "advance"
//! secs = 86400
//!
//! [[steps]]
//! action = "bid"
//! who = "alice"
//! amount = "5e53"
//! ```

use anyhow::{bail, Context, Result};
use dutch_auction::math::{self, U256};
use dutch_auction::{label_address, DecaySchedule, EscrowPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    pub auction: AuctionConfig,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuctionConfig {
    /// Label of the offered asset
    pub token: String,
    /// Label of the reserve (funding) asset
    #[serde(default = "default_reserve")]
    pub reserve: String,
    /// Label of the house
    #[serde(default = "default_house")]
    pub house: String,
    /// Sale quantity in base units
    pub quantity: String,
    /// Launch time (unix seconds)
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub escrow: EscrowConfig,
    pub schedule: Option<ScheduleConfig>,
}

fn default_reserve() -> String {
    "CLNY".to_string()
}

fn default_house() -> String {
    "house".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowConfig {
    #[default]
    Burn,
    Release(String),
}

impl EscrowConfig {
    pub fn policy(&self) -> EscrowPolicy {
        match self {
            EscrowConfig::Burn => EscrowPolicy::Burn,
            EscrowConfig::Release(to) => EscrowPolicy::Release {
                to: label_address(to),
            },
        }
    }
}

/// Overrides for the default decay schedule
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScheduleConfig {
    pub period_secs: Option<u64>,
    pub ceiling_exponent: Option<u32>,
    pub decay_numerator: Option<u64>,
    pub decay_denominator: Option<u64>,
}

impl ScheduleConfig {
    pub fn resolve(&self) -> DecaySchedule {
        let d = DecaySchedule::default();
        DecaySchedule {
            period_secs: self.period_secs.unwrap_or(d.period_secs),
            ceiling_exponent: self.ceiling_exponent.unwrap_or(d.ceiling_exponent),
            decay_numerator: self.decay_numerator.unwrap_or(d.decay_numerator),
            decay_denominator: self.decay_denominator.unwrap_or(d.decay_denominator),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Participant {
    pub name: String,
    /// Reserve-asset balance minted before launch
    pub balance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Move the clock forward
    Advance { secs: u64 },
    Bid { who: String, amount: String },
    Finalize,
    Claim { who: String },
    /// Claim for every participant in declaration order
    ClaimAll,
    Destruct,
    /// Record the current price and cap
    Price,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("Invalid scenario: {}", path.display()))
    }

    pub fn parse(data: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(data).context("Failed to parse scenario TOML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        parse_amount(&self.auction.quantity).context("auction.quantity")?;
        for p in &self.participants {
            parse_amount(&p.balance).with_context(|| format!("balance of {}", p.name))?;
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                Step::Bid { who, amount } => {
                    self.participant(who).with_context(|| format!("step {}", i + 1))?;
                    parse_amount(amount).with_context(|| format!("step {}", i + 1))?;
                }
                Step::Claim { who } => {
                    self.participant(who).with_context(|| format!("step {}", i + 1))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn participant(&self, name: &str) -> Result<&Participant> {
        match self.participants.iter().find(|p| p.name == name) {
            Some(p) => Ok(p),
            None => bail!("Unknown participant: {}", name),
        }
    }
}

/// Parse a base-unit amount: plain decimal (`_` separators allowed) or
/// `<digits>e<exponent>`.
pub fn parse_amount(s: &str) -> Result<U256> {
    let s = s.trim();
    if let Some((mantissa, exp)) = s.split_once(['e', 'E']) {
        let mantissa = math::parse_amount(mantissa)
            .with_context(|| format!("Invalid amount mantissa: {}", s))?;
        let exp: u32 = exp.parse().with_context(|| format!("Invalid amount exponent: {}", s))?;
        let scale = math::pow10(exp).with_context(|| format!("Amount out of range: {}", s))?;
        return math::mul(mantissa, scale).with_context(|| format!("Amount out of range: {}", s));
    }
    math::parse_amount(s).with_context(|| format!("Invalid amount: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [auction]
        token = "TKN"
        quantity = "3e36"
        escrow = { release = "treasury" }

        [auction.schedule]
        period_secs = 3600

        [[participants]]
        name = "alice"
        balance = "1_000_000"

        [[steps]]
        action = "advance"
        secs = 60

        [[steps]]
        action = "bid"
        who = "alice"
        amount = "500"

        [[steps]]
        action = "claim_all"
    "#;

    #[test]
    fn test_parse_amount_forms() {
        assert_eq!(parse_amount("1_000").unwrap(), U256::from(1000u64));
        assert_eq!(parse_amount("3e2").unwrap(), U256::from(300u64));
        assert_eq!(parse_amount(" 42 ").unwrap(), U256::from(42u64));
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("1e99").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::parse(SAMPLE).unwrap();
        assert_eq!(scenario.auction.reserve, "CLNY");
        assert_eq!(scenario.auction.house, "house");
        assert_eq!(
            scenario.auction.escrow,
            EscrowConfig::Release("treasury".to_string())
        );
        let schedule = scenario.auction.schedule.as_ref().unwrap().resolve();
        assert_eq!(schedule.period_secs, 3600);
        assert_eq!(schedule.ceiling_exponent, 36);
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[2], Step::ClaimAll);
    }

    #[test]
    fn test_unknown_participant_rejected() {
        let bad = SAMPLE.replace("who = \"alice\"", "who = \"mallory\"");
        let err = Scenario::parse(&bad).unwrap_err();
        assert!(format!("{:#}", err).contains("mallory"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.participants[0].name, "alice");

        let missing = Scenario::load(Path::new("/nonexistent/scenario.toml"));
        assert!(missing.is_err());
    }
}
