//! Checked signed arithmetic probe

use anyhow::{Context, Result};
use colored::Colorize;
use dutch_auction::math::MathResult;
use dutch_auction::{add_int, can_add, can_mul, can_sub, mul_int, sub_int, I256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Op {
    Add,
    Sub,
    Mul,
}

impl Op {
    fn symbol(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
        }
    }

    pub fn evaluate(&self, a: I256, b: I256) -> (bool, MathResult<I256>) {
        match self {
            Op::Add => (can_add(a, b), add_int(a, b)),
            Op::Sub => (can_sub(a, b), sub_int(a, b)),
            Op::Mul => (can_mul(a, b), mul_int(a, b)),
        }
    }
}

pub fn run(op: Op, a: &str, b: &str) -> Result<()> {
    let a: I256 = a.parse().with_context(|| format!("Invalid operand: {}", a))?;
    let b: I256 = b.parse().with_context(|| format!("Invalid operand: {}", b))?;
    let (representable, result) = op.evaluate(a, b);

    println!("{}", "=== Checked I256 ===".bright_green().bold());
    println!("{} {} {} {}", "Expression:".bright_cyan(), a, op.symbol(), b);
    println!(
        "{} {}",
        "Representable:".bright_cyan(),
        if representable { "yes" } else { "no" }
    );
    match result {
        Ok(v) => println!("{} {}", "Result:".bright_cyan(), v),
        Err(e) => println!("{} {}", "Result:".bright_cyan(), e.to_string().bright_red()),
    }
    Ok(())
}
