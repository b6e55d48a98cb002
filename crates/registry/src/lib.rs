//! Chain catalog for the balance tracker.
//!
//! This crate provides:
//! - Chain descriptors (EVM and TRON) with a self-healing registry
//! - The per-query [`ChainTarget`] snapshot taken from a descriptor
//! - Token presets and block explorer links

pub mod chain;
pub mod presets;
pub mod registry;

pub use chain::{
    explorer_link, ChainDescriptor, ChainTarget, LinkKind, DEFAULT_TRON_ENDPOINT, TRON_KEY,
};
pub use normalize::ChainFamily;
pub use presets::{find_preset, presets_for, TokenPreset};
pub use registry::{default_chains, ChainRegistry, RegistryError};
