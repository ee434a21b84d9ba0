//! Asset ledger interface
//!
//! The auction never holds balances itself: escrow, payouts and burns go
//! through an [`AssetLedger`]. [`MemoryLedger`] is a complete in-memory
//! implementation used by the test suite and the CLI simulator.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::error::LedgerError;
use crate::math::{self, U256};

/// 32-byte account / asset identity
pub type Address = [u8; 32];

pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Derive a stable address from a domain tag and arbitrary parts.
pub fn derive_address(domain: &[u8], parts: &[&[u8]]) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Address for a human-readable label (participants and tokens in scenarios).
pub fn label_address(label: &str) -> Address {
    derive_address(b"dutch-auction/label", &[label.as_bytes()])
}

/// Short hex rendering for logs.
pub fn short(addr: &Address) -> String {
    addr[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Fungible-asset ledger operations the auction depends on.
pub trait AssetLedger {
    /// Balance of `owner` in `token`
    fn balance_of(&self, token: &Address, owner: &Address) -> U256;

    /// Move `amount` of `token` from `from` to `to`. The caller acts as `from`.
    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), LedgerError>;

    /// Move `amount` on behalf of `from`, spending an allowance `from` granted to `spender`.
    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), LedgerError>;

    /// Destroy `amount` of `token` held by `owner`, reducing total supply.
    fn burn(&mut self, token: &Address, owner: &Address, amount: U256) -> Result<(), LedgerError>;
}

/// In-memory ledger over ordered maps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLedger {
    balances: BTreeMap<(Address, Address), U256>,
    allowances: BTreeMap<(Address, Address, Address), U256>,
    supply: BTreeMap<Address, U256>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` of `token` for `to`.
    pub fn mint(&mut self, token: &Address, to: &Address, amount: U256) -> Result<(), LedgerError> {
        let supply = math::add(self.total_supply(token), amount)?;
        let balance = math::add(self.balance_of(token, to), amount)?;
        self.supply.insert(*token, supply);
        self.balances.insert((*token, *to), balance);
        Ok(())
    }

    /// Allow `spender` to pull up to `amount` of `owner`'s `token`.
    pub fn approve(&mut self, token: &Address, owner: &Address, spender: &Address, amount: U256) {
        self.allowances.insert((*token, *owner, *spender), amount);
    }

    pub fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(&(*token, *owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn total_supply(&self, token: &Address) -> U256 {
        self.supply.get(token).copied().unwrap_or_default()
    }

    fn debit(&self, token: &Address, owner: &Address, amount: U256) -> Result<U256, LedgerError> {
        let available = self.balance_of(token, owner);
        available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance { required: amount, available })
    }
}

impl AssetLedger for MemoryLedger {
    fn balance_of(&self, token: &Address, owner: &Address) -> U256 {
        self.balances
            .get(&(*token, *owner))
            .copied()
            .unwrap_or_default()
    }

    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let from_after = self.debit(token, from, amount)?;
        if from == to {
            return Ok(());
        }
        let to_after = math::add(self.balance_of(token, to), amount)?;
        self.balances.insert((*token, *from), from_after);
        self.balances.insert((*token, *to), to_after);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let approved = self.allowance(token, from, spender);
        let remaining = approved
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientAllowance { required: amount, approved })?;
        self.transfer(token, from, to, amount)?;
        self.allowances.insert((*token, *from, *spender), remaining);
        Ok(())
    }

    fn burn(&mut self, token: &Address, owner: &Address, amount: U256) -> Result<(), LedgerError> {
        let balance_after = self.debit(token, owner, amount)?;
        let supply_after = math::sub(self.total_supply(token), amount)?;
        self.balances.insert((*token, *owner), balance_after);
        self.supply.insert(*token, supply_after);
        Ok(())
    }
}
