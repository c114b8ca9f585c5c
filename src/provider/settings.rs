// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-session router settings.

use std::time::Duration;

use crate::resources::ProviderRpc;

/// Default bound on handing a request to the backend.
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on waiting for the backend's response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on waiting for the session loop to exit on close.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Value reported by `web3_clientVersion` unless overridden.
pub fn default_client_version() -> String {
    format!("wallet-router/v{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Active chain at session start.
    pub chain_id: u64,
    /// Account addresses exposed once the session is unlocked.
    pub accounts: Vec<String>,
    /// Chains the session may switch to, besides `chain_id`.
    pub known_chains: Vec<u64>,
    pub client_version: String,
    pub forward_timeout: Duration,
    pub response_timeout: Duration,
    pub close_timeout: Duration,
    /// Start with accounts already exposed.
    pub unlocked: bool,
}

impl ProviderSettings {
    pub fn new(chain_id: u64, accounts: Vec<String>) -> Self {
        Self {
            chain_id,
            accounts,
            known_chains: Vec::new(),
            client_version: default_client_version(),
            forward_timeout: DEFAULT_FORWARD_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            unlocked: false,
        }
    }

    /// Settings for a loaded provider configuration.
    ///
    /// The active chain is the chain of the first backend forward, every other
    /// chain reachable through the backend is known. Returns `None` when the
    /// backend reaches no chain at all.
    pub fn from_provider(provider: &ProviderRpc) -> Option<Self> {
        let chain = provider.default_chain()?;
        let mut settings = Self::new(chain.chain_id, provider.addresses());
        settings.known_chains = provider.chains().iter().map(|c| c.chain_id).collect();
        Some(settings)
    }

    pub fn with_client_version(mut self, version: impl Into<String>) -> Self {
        self.client_version = version.into();
        self
    }

    pub fn with_timeouts(mut self, forward: Duration, response: Duration) -> Self {
        self.forward_timeout = forward;
        self.response_timeout = response;
        self
    }

    pub fn with_known_chains(mut self, chains: impl IntoIterator<Item = u64>) -> Self {
        self.known_chains = chains.into_iter().collect();
        self
    }

    pub fn unlocked(mut self, unlocked: bool) -> Self {
        self.unlocked = unlocked;
        self
    }
}
