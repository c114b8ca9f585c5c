// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Resource Graph
//!
//! Declarative configuration for the router: chains, RPC endpoints,
//! accounts, wallets, signers, tokens and holdings. Each object lives in its
//! own YAML unit in a [`ResourceStore`] and refers to other objects by
//! identifier.
//!
//! ## Store Layout (conventional, not enforced)
//!
//! ```text
//! /currencies/{name}.yaml
//! /chains/{name}.yaml        # -> currency
//! /explorers/{name}.yaml     # -> chain
//! /rpc-vendors/{name}.yaml
//! /rpcs/{name}.yaml          # -> rpc-vendor, chain
//! /composite-rpcs/{name}.yaml  # -> rpc*
//! /providers/{name}.yaml     # -> composite-rpc, account*
//! /accounts/{name}.yaml
//! /wallets/{name}.yaml       # -> account*
//! /signers/{name}.yaml       # -> hardware
//! /hardware/{name}.yaml
//! /tokens/{name}.yaml        # -> chain
//! /holdings/{name}.yaml      # -> account, token xor currency
//! /scripts/{name}.yaml       # -> chain*
//! ```
//!
//! Decoding is strict: unknown keys are load errors.

pub mod error;
pub mod id;
pub mod kind;
pub mod manager;
pub mod matcher;
pub mod store;
pub mod types;

use serde::de::DeserializeOwned;

pub use error::ResourceError;
pub use id::{ResourceId, ResourceRef};
pub use kind::ResourceKind;
pub use manager::{LoadContext, ResourceManager};
pub use matcher::MethodMatcher;
pub use store::{FsStore, MemoryStore, ResourceStore};
pub use types::*;

/// A configuration object that can be loaded through the [`ResourceManager`].
pub trait Resource: DeserializeOwned + Send + Sync + 'static {
    const KIND: ResourceKind;

    /// Resolve reference fields (in declaration order) and check invariants.
    fn init(&mut self, _ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        Ok(())
    }
}
