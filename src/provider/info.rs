// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EIP-6963 provider announcement.

use serde::Serialize;
use uuid::Uuid;

use crate::resources::ProviderRpc;

pub const DEFAULT_RDNS: &str = "network.relational.wallet-router";

/// Announced to dApps through `eip6963:announceProvider`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub uuid: Uuid,
    pub name: String,
    /// Data URI of the provider icon.
    pub icon: String,
    pub rdns: String,
}

impl ProviderInfo {
    /// The uuid is the provider's per-load session id.
    pub fn from_provider(provider: &ProviderRpc, rdns: impl Into<String>) -> Self {
        Self {
            uuid: provider.session_id,
            name: provider.name.clone(),
            icon: provider.icon.clone(),
            rdns: rdns.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_announcement_fields() {
        let info = ProviderInfo {
            uuid: Uuid::nil(),
            name: "Default".to_string(),
            icon: "data:image/svg+xml,<svg/>".to_string(),
            rdns: DEFAULT_RDNS.to_string(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["uuid"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["rdns"], DEFAULT_RDNS);
        assert_eq!(json.as_object().unwrap().len(), 4);
    }
}
