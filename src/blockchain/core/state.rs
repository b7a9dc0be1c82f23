use crate::types::{Address, H256, U256};
use std::collections::HashMap;

/// A single account record: balance, nonce, optional contract code, and
/// contract storage.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Account {
    pub balance: U256,
    pub nonce: u64,
    pub code: Option<Vec<u8>>,
    pub storage: HashMap<H256, H256>,
}

/// Pending changes to one account, produced by the execution backend.
/// `None` fields are left untouched; storage writes merge key-by-key.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub balance: Option<U256>,
    pub code: Option<Vec<u8>>,
    pub storage: HashMap<H256, H256>,
}

/// A state diff computed by transaction execution, applied atomically.
#[derive(Debug, Clone, Default)]
pub struct StateDelta {
    pub updates: HashMap<Address, AccountUpdate>,
}

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) -> &mut Self {
        self.updates.entry(address).or_default().balance = Some(balance);
        self
    }

    pub fn set_code(&mut self, address: Address, code: Vec<u8>) -> &mut Self {
        self.updates.entry(address).or_default().code = Some(code);
        self
    }

    pub fn write_storage(&mut self, address: Address, key: H256, value: H256) -> &mut Self {
        self.updates.entry(address).or_default().storage.insert(key, value);
        self
    }
}

/// Authoritative mapping of address to account record.
///
/// Reads never fail: unknown addresses yield zero-valued defaults. The
/// `set_*` overrides are the trusted test-control path and bypass all
/// transaction semantics; they must never be reachable from an untrusted
/// client path other than the testing-control RPC methods.
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    accounts: HashMap<Address, Account>,
}

impl AccountState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    pub fn nonce_of(&self, address: &Address) -> u64 {
        self.accounts
            .get(address)
            .map(|a| a.nonce)
            .unwrap_or_default()
    }

    pub fn code_of(&self, address: &Address) -> Option<&[u8]> {
        self.accounts
            .get(address)
            .and_then(|a| a.code.as_deref())
    }

    pub fn storage_at(&self, address: &Address, key: &H256) -> H256 {
        self.accounts
            .get(address)
            .and_then(|a| a.storage.get(key).copied())
            .unwrap_or_default()
    }

    /// Unconditional overwrite; bypasses all transaction semantics.
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    /// Unconditional overwrite; bypasses all transaction semantics.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.accounts.entry(address).or_default().nonce = nonce;
    }

    /// Increment an account's nonce by exactly one.
    pub fn bump_nonce(&mut self, address: &Address) {
        let account = self.accounts.entry(*address).or_default();
        account.nonce = account.nonce.saturating_add(1);
    }

    /// Applies a state diff all at once. Every entry is an overwrite, so
    /// application cannot fail part-way: either the whole delta lands or
    /// the caller never invokes this.
    pub fn apply_delta(&mut self, delta: StateDelta) {
        for (address, update) in delta.updates {
            let account = self.accounts.entry(address).or_default();
            if let Some(balance) = update.balance {
                account.balance = balance;
            }
            if let Some(code) = update.code {
                account.code = Some(code);
            }
            for (key, value) in update.storage {
                account.storage.insert(key, value);
            }
        }
    }
}
