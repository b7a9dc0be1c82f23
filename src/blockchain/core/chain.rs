use crate::blockchain::core::state::AccountState;
use crate::error::{NodeError, Result};
use crate::executor::{ExecutionBackend, Executor, Receipt, TransferBackend};
use crate::genesis;
use crate::impersonation::ImpersonationSet;
use crate::transaction::Transaction;
use crate::types::{Address, H256};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Genesis block timestamp: 2023-01-01T00:00:00Z in milliseconds.
pub const GENESIS_TIMESTAMP: u64 = 1_672_531_200_000;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    /// Milliseconds since epoch.
    pub timestamp: u64,
    pub parent_hash: H256,
    pub transactions_root: H256,
}

impl BlockHeader {
    pub fn hash(&self) -> H256 {
        let mut hasher = Sha256::new();
        hasher.update(self.number.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.parent_hash.as_bytes());
        hasher.update(self.transactions_root.as_bytes());
        H256::from_slice(&hasher.finalize())
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    /// Hashes of the transactions sealed into this block, in order.
    pub transactions: Vec<H256>,
}

impl Block {
    pub fn new(number: u64, parent_hash: H256, timestamp: u64, transactions: Vec<H256>) -> Self {
        let transactions_root = Self::calculate_transactions_root(&transactions);
        Block {
            header: BlockHeader {
                number,
                timestamp,
                parent_hash,
                transactions_root,
            },
            transactions,
        }
    }

    pub fn hash(&self) -> H256 {
        self.header.hash()
    }

    pub fn calculate_transactions_root(transactions: &[H256]) -> H256 {
        let mut hasher = Sha256::new();
        for tx_hash in transactions {
            hasher.update(tx_hash.as_bytes());
        }
        H256::from_slice(&hasher.finalize())
    }
}

/// The state-and-block engine: authoritative account state, the
/// impersonation set, the execution pipeline, and the append-only block
/// history. All mutation funnels through `&mut self`, so wrapping the
/// chain in a single `RwLock` serializes every read-then-write operation.
pub struct Blockchain {
    pub blocks: Vec<Block>,
    pub state: AccountState,
    pub impersonation: ImpersonationSet,
    executor: Executor,
    chain_id: u64,
    /// Seal each executed transaction into its own block immediately.
    auto_mine: bool,
    /// Logical chain clock in milliseconds. Advances only when blocks are
    /// sealed.
    current_timestamp: u64,
    rich_accounts: Vec<Address>,
    signers: HashMap<Address, crate::crypto::KeyPair>,
    /// Executed transactions waiting to be sealed into the next block.
    pending: Vec<(Transaction, Receipt)>,
    receipts: HashMap<H256, Receipt>,
}

impl Blockchain {
    /// Create a new chain with the built-in transfer backend.
    pub fn new(chain_id: u64, auto_mine: bool) -> Result<Self> {
        Self::new_with_backend(chain_id, auto_mine, Box::new(TransferBackend))
    }

    /// Create a new chain with the provided execution backend.
    pub fn new_with_backend(
        chain_id: u64,
        auto_mine: bool,
        backend: Box<dyn ExecutionBackend>,
    ) -> Result<Self> {
        let mut state = AccountState::new();
        let accounts = genesis::seed(&mut state)?;
        let rich_accounts: Vec<Address> = accounts.iter().map(|a| a.address).collect();
        let signers = accounts
            .into_iter()
            .map(|a| (a.address, a.keypair))
            .collect();

        let genesis_block = Block::new(0, H256::zero(), GENESIS_TIMESTAMP, Vec::new());

        Ok(Blockchain {
            blocks: vec![genesis_block],
            state,
            impersonation: ImpersonationSet::new(),
            executor: Executor::new(backend),
            chain_id,
            auto_mine,
            current_timestamp: GENESIS_TIMESTAMP,
            rich_accounts,
            signers,
            pending: Vec::new(),
            receipts: HashMap::new(),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn current_timestamp(&self) -> u64 {
        self.current_timestamp
    }

    pub fn rich_accounts(&self) -> &[Address] {
        &self.rich_accounts
    }

    pub fn latest_block(&self) -> &Block {
        // The chain always holds at least the genesis block.
        self.blocks.last().expect("chain is never empty")
    }

    pub fn latest_number(&self) -> u64 {
        self.latest_block().header.number
    }

    pub fn block_by_number(&self, number: u64) -> Option<&Block> {
        self.blocks.get(number as usize)
    }

    pub fn receipt(&self, tx_hash: &H256) -> Option<&Receipt> {
        self.receipts.get(tx_hash)
    }

    /// Direct balance override: trusted testing-control path, bypasses all
    /// transaction semantics.
    pub fn set_balance(&mut self, address: Address, balance: crate::types::U256) {
        tracing::debug!(address = %format!("{:#x}", address), %balance, "balance override");
        self.state.set_balance(address, balance);
    }

    /// Direct nonce override: trusted testing-control path.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        tracing::debug!(address = %format!("{:#x}", address), nonce, "nonce override");
        self.state.set_nonce(address, nonce);
    }

    /// Execute a transaction and queue it for the next sealed block. When
    /// the node is configured for immediate mining, the block is sealed
    /// before this returns, so the receipt is queryable right away.
    ///
    /// Unsigned submissions from an address whose key the node holds (the
    /// rich registry) are signed server-side; anything else must carry a
    /// signature or an impersonation grant.
    pub fn submit_transaction(&mut self, mut tx: Transaction) -> Result<H256> {
        if tx.signature.is_none() && !self.impersonation.is_impersonated(&tx.from) {
            if let Some(keypair) = self.signers.get(&tx.from) {
                if tx.nonce.is_none() {
                    tx.nonce = Some(self.state.nonce_of(&tx.from));
                }
                tx = tx.signed_by(keypair)?;
            }
        }

        let (tx, receipt) = self
            .executor
            .execute(&mut self.state, &self.impersonation, tx)?;
        let tx_hash = receipt.transaction_hash;

        tracing::info!(
            tx = %format!("{:#x}", tx_hash),
            from = %format!("{:#x}", tx.from),
            status = ?receipt.status,
            "transaction executed"
        );

        self.pending.push((tx, receipt));
        if self.auto_mine {
            self.seal_pending();
        }

        Ok(tx_hash)
    }

    /// Seal one block containing every pending transaction, advancing the
    /// clock by the minimum per-block increment of one millisecond.
    pub fn seal_pending(&mut self) {
        let timestamp = self.current_timestamp + 1;
        let staged = self.stage_block(self.latest_block().hash(), self.latest_number() + 1, timestamp);
        self.current_timestamp = timestamp;
        self.commit_blocks(vec![staged]);
    }

    /// Seal `count` blocks on demand, empty blocks included. Block `i`
    /// (0-indexed) is stamped `base + i * interval_ms` where `base` is the
    /// timestamp the very next block would get under normal rules, i.e.
    /// the current clock plus one millisecond. Afterwards the clock sits on
    /// the last sealed block's timestamp.
    ///
    /// All-or-nothing: every parameter and timestamp is validated before
    /// the first block is staged, and the staged batch is appended in a
    /// single extend, so a failure leaves the chain head untouched.
    pub fn mine_blocks(&mut self, count: u64, interval_secs: u64) -> Result<()> {
        if count == 0 {
            return Err(NodeError::Validation(
                "block count must be greater than zero".to_string(),
            ));
        }
        let interval_ms = interval_secs
            .checked_mul(1_000)
            .ok_or_else(|| NodeError::Validation("interval out of range".to_string()))?;
        let base = self
            .current_timestamp
            .checked_add(1)
            .ok_or_else(|| NodeError::Internal("chain clock overflow".to_string()))?;
        let last_timestamp = (count - 1)
            .checked_mul(interval_ms)
            .and_then(|offset| base.checked_add(offset))
            .ok_or_else(|| NodeError::Validation("timestamp out of range".to_string()))?;

        let mut parent_hash = self.latest_block().hash();
        let mut number = self.latest_number();
        let mut staged = Vec::with_capacity(count as usize);
        for i in 0..count {
            number += 1;
            let timestamp = base + i * interval_ms;
            // Pending transactions land in the first block of the batch.
            let block = self.stage_block(parent_hash, number, timestamp);
            parent_hash = block.0.hash();
            staged.push(block);
        }

        self.current_timestamp = last_timestamp;
        self.commit_blocks(staged);

        tracing::info!(count, interval_secs, latest = self.latest_number(), "mined blocks");
        Ok(())
    }

    /// Build a block at the given position, draining the pending pool into
    /// it and stamping its receipts with their final position.
    fn stage_block(
        &mut self,
        parent_hash: H256,
        number: u64,
        timestamp: u64,
    ) -> (Block, Vec<Receipt>) {
        let drained = std::mem::take(&mut self.pending);
        let tx_hashes: Vec<H256> = drained.iter().map(|(_, r)| r.transaction_hash).collect();
        let block = Block::new(number, parent_hash, timestamp, tx_hashes);
        let block_hash = block.hash();

        let receipts = drained
            .into_iter()
            .enumerate()
            .map(|(index, (_, mut receipt))| {
                receipt.transaction_index = index as u64;
                receipt.block_number = Some(number);
                receipt.block_hash = Some(block_hash);
                receipt
            })
            .collect();

        (block, receipts)
    }

    /// Append staged blocks and index their receipts. Infallible by
    /// construction: everything that can fail happened before staging.
    fn commit_blocks(&mut self, staged: Vec<(Block, Vec<Receipt>)>) {
        for (block, receipts) in staged {
            debug_assert_eq!(block.header.number, self.latest_number() + 1);
            debug_assert!(block.header.timestamp >= self.latest_block().header.timestamp);
            self.blocks.push(block);
            for receipt in receipts {
                self.receipts.insert(receipt.transaction_hash, receipt);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::U256;

    fn addr(byte: u8) -> Address {
        Address::from_slice(&[byte; 20])
    }

    #[test]
    fn test_genesis_chain_shape() {
        let chain = Blockchain::new(260, true).unwrap();
        assert_eq!(chain.latest_number(), 0);
        assert_eq!(chain.current_timestamp(), GENESIS_TIMESTAMP);
        assert_eq!(chain.rich_accounts().len(), 10);
    }

    #[test]
    fn test_mine_advances_block_number_by_count() {
        let mut chain = Blockchain::new(260, true).unwrap();
        let start = chain.latest_number();
        chain.mine_blocks(100, 60).unwrap();
        assert_eq!(chain.latest_number(), start + 100);
    }

    #[test]
    fn test_mine_timestamp_formula() {
        let mut chain = Blockchain::new(260, true).unwrap();
        let t0 = chain.current_timestamp();
        chain.mine_blocks(100, 60).unwrap();
        let expected = t0 + 99 * 60 * 1_000 + 1;
        assert_eq!(chain.current_timestamp(), expected);
        assert_eq!(chain.latest_block().header.timestamp, expected);
    }

    #[test]
    fn test_mine_single_block_default_interval() {
        let mut chain = Blockchain::new(260, true).unwrap();
        let t0 = chain.current_timestamp();
        chain.mine_blocks(1, 1).unwrap();
        assert_eq!(chain.current_timestamp(), t0 + 1);
    }

    #[test]
    fn test_mine_zero_count_rejected_without_side_effects() {
        let mut chain = Blockchain::new(260, true).unwrap();
        let head = chain.latest_number();
        let clock = chain.current_timestamp();
        let err = chain.mine_blocks(0, 1).unwrap_err();
        assert!(matches!(err, NodeError::Validation(_)));
        assert_eq!(chain.latest_number(), head);
        assert_eq!(chain.current_timestamp(), clock);
    }

    #[test]
    fn test_blocks_are_linked_and_monotonic() {
        let mut chain = Blockchain::new(260, true).unwrap();
        chain.mine_blocks(5, 3).unwrap();
        for window in chain.blocks.windows(2) {
            assert_eq!(window[1].header.number, window[0].header.number + 1);
            assert_eq!(window[1].header.parent_hash, window[0].hash());
            assert!(window[1].header.timestamp >= window[0].header.timestamp);
        }
    }

    #[test]
    fn test_auto_mine_seals_each_transaction() {
        let mut chain = Blockchain::new(260, true).unwrap();
        chain.impersonation.grant(addr(1));
        chain.set_balance(addr(1), U256::from(1_000u64));

        let start = chain.latest_number();
        let hash = chain
            .submit_transaction(Transaction::transfer(addr(1), addr(2), U256::from(10u64)))
            .unwrap();

        assert_eq!(chain.latest_number(), start + 1);
        let receipt = chain.receipt(&hash).expect("receipt sealed");
        assert_eq!(receipt.block_number, Some(start + 1));
        assert_eq!(chain.latest_block().transactions, vec![hash]);
    }

    #[test]
    fn test_manual_mining_includes_pending_transactions() {
        let mut chain = Blockchain::new(260, false).unwrap();
        chain.impersonation.grant(addr(1));
        chain.set_balance(addr(1), U256::from(1_000u64));

        let hash = chain
            .submit_transaction(Transaction::transfer(addr(1), addr(2), U256::from(10u64)))
            .unwrap();
        // Not sealed yet: no receipt available.
        assert!(chain.receipt(&hash).is_none());

        chain.mine_blocks(2, 1).unwrap();
        let receipt = chain.receipt(&hash).expect("sealed by mine");
        assert_eq!(receipt.block_number, Some(1));
        // The second block of the batch is empty.
        assert!(chain.block_by_number(2).unwrap().transactions.is_empty());
    }

    #[test]
    fn test_rich_account_transaction_signed_server_side() {
        let mut chain = Blockchain::new(260, true).unwrap();
        let rich = chain.rich_accounts()[0];
        let before = chain.state.balance_of(&rich);

        let hash = chain
            .submit_transaction(Transaction::transfer(rich, addr(9), U256::from(42u64)))
            .unwrap();

        assert!(chain.receipt(&hash).is_some());
        assert_eq!(chain.state.balance_of(&rich), before - U256::from(42u64));
        assert_eq!(chain.state.balance_of(&addr(9)), U256::from(42u64));
    }

    #[test]
    fn test_unknown_sender_rejected() {
        let mut chain = Blockchain::new(260, true).unwrap();
        chain.set_balance(addr(7), U256::from(1_000u64));
        let err = chain
            .submit_transaction(Transaction::transfer(addr(7), addr(2), U256::from(1u64)))
            .unwrap_err();
        assert!(matches!(err, NodeError::Authorization(_)));
    }

    #[test]
    fn test_timestamp_zero_interval_keeps_timestamps_flat() {
        let mut chain = Blockchain::new(260, true).unwrap();
        let t0 = chain.current_timestamp();
        chain.mine_blocks(3, 0).unwrap();
        assert_eq!(chain.current_timestamp(), t0 + 1);
        for number in 1..=3 {
            assert_eq!(
                chain.block_by_number(number).unwrap().header.timestamp,
                t0 + 1
            );
        }
    }
}
