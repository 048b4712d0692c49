#![deny(clippy::all, missing_docs)]
#![warn(clippy::pedantic, clippy::nursery, dead_code)]

//! `covenant` composes, encodes and signs caveat-scoped delegations for
//! delegation-framework smart accounts (`DeleGator`s).
//!
//! A delegator grants a delegate a narrowly scoped permission by attaching an
//! ordered list of caveats to a delegation. Each caveat names an on-chain
//! enforcer contract and carries `terms`, a byte string whose layout the
//! enforcer decodes at redemption time. This crate owns those byte layouts,
//! the ordering rules between caveats, and the EIP-712 signing of the final
//! delegation. It never performs network I/O itself.

/// Low level primitives: hex handling, fixed-width packing, logging and configuration.
pub mod primitives;

/// Caveat term encoders/decoders, the caveat builder and the scope resolver.
pub mod caveats;

/// Deployed contract addresses per chain and framework version.
pub mod environment;

/// Delegation records, EIP-712 hashing and ABI encoding for redemption.
pub mod delegation;

/// Signer backends and multi-signature aggregation.
pub mod signer;

/// String-typed entry points for foreign (Swift/Kotlin) callers.
pub mod foreign;

pub use covenant_macros::{covenant_error, covenant_export};

uniffi::setup_scaffolding!("covenant");
