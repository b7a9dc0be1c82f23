//! Impersonation grants: addresses exempt from signature verification.
//!
//! Impersonation is a dynamic, revocable capability standing in for
//! cryptographic proof. The set is consulted exactly once per transaction,
//! at authorization time, and nowhere else; execution logic never inspects
//! it directly.

use crate::types::Address;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct ImpersonationSet {
    addresses: HashSet<Address>,
}

impl ImpersonationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant impersonation. Idempotent: re-granting is a no-op.
    pub fn grant(&mut self, address: Address) {
        if self.addresses.insert(address) {
            tracing::debug!(address = %format!("{:#x}", address), "impersonation granted");
        }
    }

    /// Revoke impersonation. Idempotent; returns whether the address was
    /// being impersonated.
    pub fn revoke(&mut self, address: &Address) -> bool {
        let was_present = self.addresses.remove(address);
        if was_present {
            tracing::debug!(address = %format!("{:#x}", address), "impersonation revoked");
        }
        was_present
    }

    pub fn is_impersonated(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
