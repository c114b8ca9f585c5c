// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::fmt;

/// Kind of a configuration resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Currency,
    Explorer,
    Chain,
    RpcVendor,
    Rpc,
    CompositeRpc,
    ProviderRpc,
    Account,
    Wallet,
    Signer,
    Hardware,
    ContractAbi,
    TokenErc20,
    TokenErc721,
    TokenErc1155,
    Holding,
    Script,
}

impl ResourceKind {
    pub const COUNT: usize = 17;

    pub const ALL: [ResourceKind; Self::COUNT] = [
        ResourceKind::Currency,
        ResourceKind::Explorer,
        ResourceKind::Chain,
        ResourceKind::RpcVendor,
        ResourceKind::Rpc,
        ResourceKind::CompositeRpc,
        ResourceKind::ProviderRpc,
        ResourceKind::Account,
        ResourceKind::Wallet,
        ResourceKind::Signer,
        ResourceKind::Hardware,
        ResourceKind::ContractAbi,
        ResourceKind::TokenErc20,
        ResourceKind::TokenErc721,
        ResourceKind::TokenErc1155,
        ResourceKind::Holding,
        ResourceKind::Script,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Currency => "currency",
            ResourceKind::Explorer => "explorer",
            ResourceKind::Chain => "chain",
            ResourceKind::RpcVendor => "rpc-vendor",
            ResourceKind::Rpc => "rpc",
            ResourceKind::CompositeRpc => "composite-rpc",
            ResourceKind::ProviderRpc => "provider-rpc",
            ResourceKind::Account => "account",
            ResourceKind::Wallet => "wallet",
            ResourceKind::Signer => "signer",
            ResourceKind::Hardware => "hardware",
            ResourceKind::ContractAbi => "contract-abi",
            ResourceKind::TokenErc20 => "token-erc20",
            ResourceKind::TokenErc721 => "token-erc721",
            ResourceKind::TokenErc1155 => "token-erc1155",
            ResourceKind::Holding => "holding",
            ResourceKind::Script => "script",
        }
    }

    /// Position in [`ResourceKind::ALL`], used to index per-kind tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
