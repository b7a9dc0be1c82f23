//! Rich account registry: a fixed, pre-funded set of accounts seeded at
//! node startup so tests have a stable, deterministic baseline. The node
//! keeps the keys and signs `eth_sendTransaction` submissions from these
//! addresses itself.

use crate::blockchain::core::state::AccountState;
use crate::crypto::KeyPair;
use crate::error::Result;
use crate::types::{Address, U256};

/// Private keys of the wallets seeded with funds at start. Development
/// keys only; they are public by design and must never hold real value.
pub const RICH_ACCOUNT_KEYS: [&str; 10] = [
    "0x7d9b0184294a57703c0ebaea5d1ca2914526c6b46016b9808da92cb862db4bd0",
    "0x2ff58b3ab5daa113c4e4233d7bc764260657ebdfbd09fa775aaa3b436295c590",
    "0x639ec8d9a7e10a50304d6e09ae018aaedd0f5c1bd2f91aecfbcb496a71841b06",
    "0x5c3b429475b1982fcdcb8c71d5ba5f10a02d8ef35deb236576fe5291746a68e2",
    "0x18b41d1738d39fd4a09ace35de950d399905e6d24d9702b3423190632c0efda0",
    "0x78af1fcfd75b5d7c2eebeacc36c153a9dfdd69fb1e3382bde48676e0923f0290",
    "0x03422372e2fb3571250e69ed0ea149cbd0b439fa08633ca6e443a284dfcd01a8",
    "0x725a4eb47331736338b99a7811e766a241b2449febd95f0e5065ab29bbc62aab",
    "0x1d1fb246fa06ad6646f1b12738b04cd3ad0db376ffe770f76321a4d780539dac",
    "0x608aa171549d889f71308c6b8c94f93e127afd930a38ea3c826eff0cc6820fe7",
];

/// Seed balance per rich account: 10,000 ether in wei.
pub fn rich_balance() -> U256 {
    U256::from(10_000u64) * U256::exp10(18)
}

/// A pre-funded account whose key the node holds.
#[derive(Debug, Clone)]
pub struct RichAccount {
    pub keypair: KeyPair,
    pub address: Address,
}

/// Derive the full registry from the fixed key list.
pub fn rich_accounts() -> Result<Vec<RichAccount>> {
    RICH_ACCOUNT_KEYS
        .iter()
        .map(|key| {
            let keypair = KeyPair::from_secret_hex(key)?;
            let address = keypair.address();
            Ok(RichAccount { keypair, address })
        })
        .collect()
}

/// Fund every rich account in the given state. Called once, at genesis;
/// afterwards these accounts change only through normal balance-changing
/// operations.
pub fn seed(state: &mut AccountState) -> Result<Vec<RichAccount>> {
    let accounts = rich_accounts()?;
    let balance = rich_balance();
    for account in &accounts {
        state.set_balance(account.address, balance);
    }
    Ok(accounts)
}
