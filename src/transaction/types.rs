/// Transaction types for DevChain
use crate::crypto::KeyPair;
use crate::error::{NodeError, Result};
use crate::types::{Address, H256, U256};
use sha2::{Digest, Sha256};

/// Maximum serialized transaction size in bytes (128KB) to prevent DoS
pub const MAX_TRANSACTION_SIZE: usize = 131_072;

/// A transaction submitted to the node.
///
/// `nonce` is optional on submission; the execution pipeline assigns the
/// sender's current nonce when it is absent. `to` is `None` for contract
/// creation. A transaction carries either a signature + public key or
/// nothing at all, in which case execution is only authorized for an
/// impersonated sender.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
    pub nonce: Option<u64>,
    pub gas_price: U256,
    pub signature: Option<Vec<u8>>,
    pub public_key: Option<Vec<u8>>,
}

impl Transaction {
    /// Create a plain value transfer with no nonce and a zero gas price.
    pub fn transfer(from: Address, to: Address, value: U256) -> Self {
        Transaction {
            from,
            to: Some(to),
            value,
            data: Vec::new(),
            nonce: None,
            gas_price: U256::zero(),
            signature: None,
            public_key: None,
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Calculate the hash of this transaction.
    ///
    /// The hash covers the resolved nonce, so it is computed after the
    /// pipeline has assigned one; two submissions from the same sender never
    /// collide.
    pub fn hash(&self) -> H256 {
        let mut hasher = Sha256::new();
        hasher.update(b"transaction");
        hasher.update(self.from.as_bytes());
        match &self.to {
            Some(to) => {
                hasher.update([1u8]);
                hasher.update(to.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update(u256_bytes(&self.value));
        hasher.update(&self.data);
        hasher.update(self.nonce.unwrap_or(0).to_le_bytes());
        hasher.update(u256_bytes(&self.gas_price));
        H256::from_slice(&hasher.finalize())
    }

    pub fn hash_str(&self) -> String {
        format!("0x{}", hex::encode(self.hash().as_bytes()))
    }

    /// The byte sequence covered by the transaction signature.
    pub fn signable_message(&self) -> Vec<u8> {
        let mut message = Vec::new();
        message.extend_from_slice(b"DEVCHAIN_TX:");
        message.extend_from_slice(self.from.as_bytes());
        match &self.to {
            Some(to) => {
                message.push(1);
                message.extend_from_slice(to.as_bytes());
            }
            None => message.push(0),
        }
        message.extend_from_slice(&u256_bytes(&self.value));
        message.extend_from_slice(&self.data);
        message.extend_from_slice(&self.nonce.unwrap_or(0).to_le_bytes());
        message.extend_from_slice(&u256_bytes(&self.gas_price));
        message
    }

    pub fn sign(&mut self, signature: Vec<u8>, public_key: Vec<u8>) {
        self.signature = Some(signature);
        self.public_key = Some(public_key);
    }

    /// Sign with the given keypair. The nonce must already be resolved so
    /// the signature commits to it.
    pub fn signed_by(mut self, keypair: &KeyPair) -> Result<Self> {
        if self.nonce.is_none() {
            return Err(NodeError::Internal(
                "cannot sign a transaction without a resolved nonce".to_string(),
            ));
        }
        let signature = keypair.sign(&self.signable_message())?;
        self.sign(signature.to_vec(), keypair.public_key_bytes().to_vec());
        Ok(self)
    }
}

fn u256_bytes(value: &U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}
