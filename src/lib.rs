//! DevChain - A single-process development blockchain node with
//! testing-control RPC extensions
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Engine
//! - [`blockchain`] - Account state, block production, and chain history
//! - [`executor`] - Transaction execution pipeline and backend seam
//! - [`transaction`] - Transaction types and validation
//! - [`impersonation`] - Signature-exemption grants for testing
//!
//! ## Cryptography
//! - [`crypto`] - Keypairs, signatures and address derivation (secp256k1)
//!
//! ## Fixtures
//! - [`genesis`] - Pre-funded rich account registry
//!
//! ## Integration
//! - [`api`] - JSON-RPC server (`eth_*`, `anvil_*`/`hardhat_*`, `config_*`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`node`] - Orchestrator and lifecycle
//! - [`error`] - Error types
//! - [`types`] - Fixed-width numerics and hex marshaling

#![forbid(unsafe_code)]

// ============================================================================
// Core Engine
// ============================================================================
pub mod blockchain;
pub mod executor;
pub mod impersonation;
pub mod transaction;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Fixtures
// ============================================================================
pub mod genesis;

// ============================================================================
// Integration
// ============================================================================
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod node;
pub mod types;
