//! Multi-chain transaction adapter core for the bridge signer network
//!
//! One [`chain::Blockchain`] implementation per chain family, behind a
//! shared [`registry::ChainRegistry`]:
//!
//! - **Address codecs** - pubkey→address derivation and validation per chain
//! - **Transaction codecs** - native wire formats, signing preimages, and
//!   signature attachment (MessagePack, BCS, Bitcoin wire, CBOR, XRPL
//!   binary, XDR)
//! - **Withdraw builders** - unsigned bridge→user transactions plus the
//!   exact bytes an external threshold signer must sign
//! - **Submitter / confirmation** - envelope assembly, raw submission, and
//!   per-chain confirmation policies
//! - **Transfer extractors** - normalized [`types::Transfer`] records from
//!   confirmed transactions
//!
//! The core holds no keys and runs no consensus; signing is an external
//! collaborator producing raw signature bytes for a given payload.

pub mod chain;
pub mod encoding;
pub mod error;
pub mod http;
pub mod registry;
pub mod types;

// Chain families
pub mod algorand;
pub mod aptos;
pub mod bitcoin;
pub mod cardano;
pub mod evm;
pub mod ripple;
pub mod stellar;

pub use chain::Blockchain;
pub use error::{AdapterError, Result};
pub use registry::ChainRegistry;
pub use types::{
    ChainDescriptor, ChainFamily, ConfirmationStatus, KeyCurve, NetworkType, Transfer,
    UnsignedWithdrawal, ZERO_ADDRESS,
};
