//! Transaction execution pipeline.
//!
//! Validates, authorizes, and applies one transaction at a time:
//! authorization (signature or impersonation grant), nonce check, balance
//! check, effect computation through the [`ExecutionBackend`], and an
//! atomic commit. A backend-reported revert still consumes the sender's
//! nonce and gas cost but applies no other state change.

use crate::blockchain::core::state::{AccountState, StateDelta};
use crate::error::{NodeError, Result};
use crate::impersonation::ImpersonationSet;
use crate::transaction::Transaction;
use crate::types::{Address, H256, U256};
use sha2::{Digest, Sha256};

/// Base execution cost charged to every transaction.
pub const BASE_TX_GAS: u64 = 21_000;

/// Gas charged per byte of transaction data.
pub const DATA_BYTE_GAS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TxStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

/// The outcome record of an executed transaction. Block fields are filled
/// in when the transaction is sealed into a block.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Receipt {
    pub transaction_hash: H256,
    pub transaction_index: u64,
    pub block_number: Option<u64>,
    pub block_hash: Option<H256>,
    pub from: Address,
    pub to: Option<Address>,
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub status: TxStatus,
    pub logs: Vec<LogEntry>,
}

/// Effects computed by the execution environment for one transaction.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub status: TxStatus,
    pub delta: StateDelta,
    pub gas_used: u64,
    pub logs: Vec<LogEntry>,
    pub contract_address: Option<Address>,
}

/// The execution environment seam.
///
/// The engine treats the virtual machine as a black box that takes a
/// transaction plus world state and returns a state diff and outcome. The
/// built-in [`TransferBackend`] covers value transfers and code
/// deployment; richer interpreters plug in here.
pub trait ExecutionBackend: Send + Sync {
    fn execute(&self, tx: &Transaction, state: &AccountState) -> Result<ExecutionOutcome>;
}

/// Minimal backend: balance transfers and raw code deployment. Never
/// reverts on its own; arithmetic failures are execution errors.
#[derive(Debug, Default)]
pub struct TransferBackend;

impl TransferBackend {
    fn gas_for(tx: &Transaction) -> u64 {
        BASE_TX_GAS.saturating_add(tx.data.len() as u64 * DATA_BYTE_GAS)
    }
}

impl ExecutionBackend for TransferBackend {
    fn execute(&self, tx: &Transaction, state: &AccountState) -> Result<ExecutionOutcome> {
        let gas_used = Self::gas_for(tx);
        let gas_cost = U256::from(gas_used)
            .checked_mul(tx.gas_price)
            .ok_or_else(|| NodeError::Execution("gas cost overflow".to_string()))?;

        let sender_balance = state.balance_of(&tx.from);
        let spent = tx
            .value
            .checked_add(gas_cost)
            .ok_or_else(|| NodeError::Execution("transaction cost overflow".to_string()))?;
        let new_sender_balance = sender_balance.checked_sub(spent).ok_or_else(|| {
            NodeError::Execution(format!(
                "insufficient funds: balance {} < cost {}",
                sender_balance, spent
            ))
        })?;

        let mut delta = StateDelta::new();
        delta.set_balance(tx.from, new_sender_balance);

        let contract_address = match &tx.to {
            Some(to) => {
                // Self-transfers must not double-count.
                let recipient_balance = if *to == tx.from {
                    new_sender_balance
                } else {
                    state.balance_of(to)
                };
                let credited = recipient_balance
                    .checked_add(tx.value)
                    .ok_or_else(|| NodeError::Execution("recipient balance overflow".to_string()))?;
                delta.set_balance(*to, credited);
                None
            }
            None => {
                let created = derive_contract_address(&tx.from, tx.nonce.unwrap_or(0));
                let credited = state
                    .balance_of(&created)
                    .checked_add(tx.value)
                    .ok_or_else(|| NodeError::Execution("recipient balance overflow".to_string()))?;
                delta.set_balance(created, credited);
                delta.set_code(created, tx.data.clone());
                Some(created)
            }
        };

        Ok(ExecutionOutcome {
            status: TxStatus::Success,
            delta,
            gas_used,
            logs: Vec::new(),
            contract_address,
        })
    }
}

/// Deterministic contract address: trailing 20 bytes of
/// sha256(sender || nonce).
fn derive_contract_address(sender: &Address, nonce: u64) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(sender.as_bytes());
    hasher.update(nonce.to_le_bytes());
    let digest = hasher.finalize();
    Address::from_slice(&digest[12..])
}

/// The pipeline itself: owns the backend, borrows state and the
/// impersonation set per call so the chain remains the single writer.
pub struct Executor {
    backend: Box<dyn ExecutionBackend>,
}

impl Executor {
    pub fn new(backend: Box<dyn ExecutionBackend>) -> Self {
        Self { backend }
    }

    /// Run one transaction through the full pipeline. On success the state
    /// delta is committed atomically, the sender's nonce is incremented by
    /// exactly one, and the receipt is returned alongside the transaction
    /// with its nonce resolved.
    pub fn execute(
        &self,
        state: &mut AccountState,
        impersonation: &ImpersonationSet,
        mut tx: Transaction,
    ) -> Result<(Transaction, Receipt)> {
        tx.validate_shape()?;

        // Authorization: valid signature matching `from`, or an
        // impersonation grant. Checked exactly once, before anything is
        // consumed.
        if tx.signature.is_some() {
            tx.verify_signature()?;
        } else if !impersonation.is_impersonated(&tx.from) {
            return Err(NodeError::Authorization(format!(
                "no known account for sender {:#x}; sign the transaction or impersonate the address",
                tx.from
            )));
        }

        // Nonce: must equal the store's current value when stated, assigned
        // from the store otherwise.
        let current_nonce = state.nonce_of(&tx.from);
        match tx.nonce {
            Some(stated) if stated != current_nonce => {
                return Err(NodeError::Execution(format!(
                    "nonce mismatch for {:#x}: expected {}, got {}",
                    tx.from, current_nonce, stated
                )));
            }
            Some(_) => {}
            None => tx.nonce = Some(current_nonce),
        }

        // Balance: must cover value plus the minimum execution cost.
        let min_gas_cost = U256::from(BASE_TX_GAS)
            .checked_mul(tx.gas_price)
            .ok_or_else(|| NodeError::Execution("gas cost overflow".to_string()))?;
        let min_cost = tx
            .value
            .checked_add(min_gas_cost)
            .ok_or_else(|| NodeError::Execution("transaction cost overflow".to_string()))?;
        let balance = state.balance_of(&tx.from);
        if balance < min_cost {
            return Err(NodeError::Execution(format!(
                "insufficient funds for {:#x}: balance {} < cost {}",
                tx.from, balance, min_cost
            )));
        }

        let outcome = self.backend.execute(&tx, state)?;

        // Commit. The nonce is consumed on success and on revert alike; a
        // revert additionally charges gas but applies no other change.
        state.bump_nonce(&tx.from);
        match outcome.status {
            TxStatus::Success => state.apply_delta(outcome.delta),
            TxStatus::Reverted => {
                let gas_cost = U256::from(outcome.gas_used).saturating_mul(tx.gas_price);
                state.set_balance(tx.from, balance.saturating_sub(gas_cost));
            }
        }

        let receipt = Receipt {
            transaction_hash: tx.hash(),
            transaction_index: 0,
            block_number: None,
            block_hash: None,
            from: tx.from,
            to: tx.to,
            contract_address: outcome.contract_address,
            gas_used: outcome.gas_used,
            status: outcome.status,
            logs: outcome.logs,
        };

        Ok((tx, receipt))
    }
}
