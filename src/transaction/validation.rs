/// Validation logic for transactions separated from type definitions
use crate::crypto::{self, verify_signature};
use crate::error::{NodeError, Result};
use crate::transaction::types::{Transaction, MAX_TRANSACTION_SIZE};

impl Transaction {
    /// Stateless shape validation: size bound, zero sender, and signature /
    /// public key pairing. Does NOT check nonce or balance; the execution
    /// pipeline does that against live state.
    pub fn validate_shape(&self) -> Result<()> {
        let serialized = bincode::serialize(self)
            .map_err(|e| NodeError::Validation(format!("serialization failed: {}", e)))?;
        if serialized.len() > MAX_TRANSACTION_SIZE {
            return Err(NodeError::Validation(format!(
                "transaction too large: {} bytes (max: {})",
                serialized.len(),
                MAX_TRANSACTION_SIZE
            )));
        }

        if self.from.is_zero() {
            return Err(NodeError::Validation(
                "sender address cannot be zero".to_string(),
            ));
        }

        if self.signature.is_some() != self.public_key.is_some() {
            return Err(NodeError::Validation(
                "signature and public key must be supplied together".to_string(),
            ));
        }

        Ok(())
    }

    /// Verifies the attached signature and that the signing key derives the
    /// `from` address. Fails with an authorization error when the
    /// transaction is unsigned.
    pub fn verify_signature(&self) -> Result<()> {
        let (signature, public_key) = match (&self.signature, &self.public_key) {
            (Some(sig), Some(pk)) => (sig, pk),
            _ => {
                return Err(NodeError::Authorization(
                    "transaction not signed".to_string(),
                ))
            }
        };

        verify_signature(public_key, &self.signable_message(), signature)?;

        let recovered = secp256k1::PublicKey::from_slice(public_key)
            .map_err(|e| NodeError::Authorization(format!("invalid public key: {}", e)))?;
        if crypto::address_from_public_key(&recovered) != self.from {
            return Err(NodeError::Authorization(
                "signing key does not match the sender address".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::types::{Address, U256};

    #[test]
    fn test_unsigned_transaction_fails_signature_check() {
        let tx = Transaction::transfer(
            Address::from_slice(&[1; 20]),
            Address::from_slice(&[2; 20]),
            U256::from(1u64),
        );
        let err = tx.verify_signature().unwrap_err();
        assert!(matches!(err, NodeError::Authorization(_)));
    }

    #[test]
    fn test_signature_must_match_sender() {
        let keypair = KeyPair::generate();
        // Signed by `keypair` but claiming to be from a different address.
        let tx = Transaction::transfer(
            Address::from_slice(&[9; 20]),
            Address::from_slice(&[2; 20]),
            U256::from(1u64),
        )
        .with_nonce(0)
        .signed_by(&keypair)
        .unwrap();
        let err = tx.verify_signature().unwrap_err();
        assert!(matches!(err, NodeError::Authorization(_)));
    }

    #[test]
    fn test_zero_sender_rejected() {
        let tx = Transaction::transfer(
            Address::zero(),
            Address::from_slice(&[2; 20]),
            U256::from(1u64),
        );
        assert!(matches!(
            tx.validate_shape().unwrap_err(),
            NodeError::Validation(_)
        ));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let tx = Transaction::transfer(
            Address::from_slice(&[1; 20]),
            Address::from_slice(&[2; 20]),
            U256::from(1u64),
        )
        .with_data(vec![0u8; MAX_TRANSACTION_SIZE + 1]);
        assert!(matches!(
            tx.validate_shape().unwrap_err(),
            NodeError::Validation(_)
        ));
    }
}
