// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mutable session state of one provider connection.
//!
//! Owned by the session loop; nothing else reads or writes it.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use crate::error::{ErrorCode, RpcError};

use super::ProviderSettings;

/// The only permission a session can grant.
pub const ETH_ACCOUNTS_PERMISSION: &str = "eth_accounts";

#[derive(Debug, Clone)]
pub struct Session {
    chain_id: u64,
    accounts: Vec<String>,
    unlocked: bool,
    known_chains: BTreeSet<u64>,
}

impl Session {
    pub fn new(settings: &ProviderSettings) -> Self {
        let mut known_chains: BTreeSet<u64> = settings.known_chains.iter().copied().collect();
        known_chains.insert(settings.chain_id);
        Self {
            chain_id: settings.chain_id,
            accounts: settings.accounts.clone(),
            unlocked: settings.unlocked,
            known_chains,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Chain id as a `0x`-prefixed hex quantity.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Configured accounts, regardless of lock state.
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    /// Accounts visible to the dApp: none while locked.
    pub fn visible_accounts(&self) -> &[String] {
        if self.unlocked {
            &self.accounts
        } else {
            &[]
        }
    }

    /// Returns whether the state changed.
    pub fn unlock(&mut self) -> bool {
        !std::mem::replace(&mut self.unlocked, true)
    }

    /// Returns whether the state changed.
    pub fn lock(&mut self) -> bool {
        std::mem::replace(&mut self.unlocked, false)
    }

    pub fn knows_chain(&self, chain_id: u64) -> bool {
        self.known_chains.contains(&chain_id)
    }

    /// Returns whether the chain was new.
    pub fn add_chain(&mut self, chain_id: u64) -> bool {
        self.known_chains.insert(chain_id)
    }

    /// Make `chain_id` active. Returns whether the active chain changed.
    pub fn switch_chain(&mut self, chain_id: u64) -> Result<bool, RpcError> {
        if !self.knows_chain(chain_id) {
            return Err(RpcError::annotated(
                ErrorCode::UnrecognizedChain,
                format!("chain {chain_id:#x} has not been added"),
            ));
        }
        Ok(std::mem::replace(&mut self.chain_id, chain_id) != chain_id)
    }

    /// EIP-2255 permission list for `wallet_getPermissions`.
    pub fn permissions(&self) -> Value {
        if !self.unlocked {
            return json!([]);
        }
        json!([{
            "parentCapability": ETH_ACCOUNTS_PERMISSION,
            "caveats": [{
                "type": "restrictReturnedAccounts",
                "value": self.accounts,
            }],
        }])
    }
}
