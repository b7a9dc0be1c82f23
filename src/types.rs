//! Fixed-width numeric and hash types plus hex quantity marshaling.
//!
//! All integers cross the RPC boundary as `0x`-prefixed hex strings and all
//! addresses as 20-byte hex identifiers; the helpers here decode both
//! losslessly and reject anything malformed before state is touched.

use crate::error::{NodeError, Result};

pub use primitive_types::{H160, H256, U256};

/// A 20-byte account identifier.
pub type Address = H160;

/// Parse a `0x`-prefixed (or bare) 20-byte hex address.
pub fn parse_address(s: &str) -> Result<Address> {
    let raw = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(raw)
        .map_err(|e| NodeError::Validation(format!("invalid hex address {:?}: {}", s, e)))?;
    if bytes.len() != 20 {
        return Err(NodeError::Validation(format!(
            "address must be 20 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

/// Parse a hex quantity into a 256-bit integer, losslessly.
pub fn parse_quantity(s: &str) -> Result<U256> {
    let raw = s.strip_prefix("0x").unwrap_or(s);
    if raw.is_empty() {
        return Err(NodeError::Validation(format!("empty hex quantity {:?}", s)));
    }
    U256::from_str_radix(raw, 16)
        .map_err(|e| NodeError::Validation(format!("invalid hex quantity {:?}: {}", s, e)))
}

/// Parse a hex quantity that must fit in 64 bits (nonces, block counts).
pub fn parse_quantity_u64(s: &str) -> Result<u64> {
    let value = parse_quantity(s)?;
    if value > U256::from(u64::MAX) {
        return Err(NodeError::Validation(format!(
            "quantity {:?} does not fit in 64 bits",
            s
        )));
    }
    Ok(value.as_u64())
}

/// Parse a `0x`-prefixed byte payload (transaction data).
pub fn parse_bytes(s: &str) -> Result<Vec<u8>> {
    let raw = s.strip_prefix("0x").unwrap_or(s);
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    hex::decode(raw).map_err(|e| NodeError::Validation(format!("invalid hex payload: {}", e)))
}

/// Format a 256-bit quantity as a minimal `0x`-prefixed hex string.
pub fn quantity_to_hex(value: U256) -> String {
    format!("{:#x}", value)
}

/// Format a 64-bit quantity as a minimal `0x`-prefixed hex string.
pub fn u64_to_hex(value: u64) -> String {
    format!("{:#x}", value)
}

/// Format an address as a full-width `0x`-prefixed hex string.
pub fn address_to_hex(addr: &Address) -> String {
    format!("0x{}", hex::encode(addr.as_bytes()))
}

/// Format a 32-byte hash as a full-width `0x`-prefixed hex string.
pub fn h256_to_hex(hash: &H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

/// Parse a `0x`-prefixed 32-byte hash.
pub fn parse_h256(s: &str) -> Result<H256> {
    let raw = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(raw)
        .map_err(|e| NodeError::Validation(format!("invalid hex hash {:?}: {}", s, e)))?;
    if bytes.len() != 32 {
        return Err(NodeError::Validation(format!(
            "hash must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(H256::from_slice(&bytes))
}
