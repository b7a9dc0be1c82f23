//! Core chain logic: account state, block production, and history.

pub mod core;

pub use core::chain::{Block, BlockHeader, Blockchain, GENESIS_TIMESTAMP};
pub use core::state::{Account, AccountState, AccountUpdate, StateDelta};
