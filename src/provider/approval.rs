// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User approval for privileged provider methods.
//!
//! Connecting accounts, adding or switching chains and granting or revoking
//! permissions all need an explicit decision from the wallet user. The router
//! awaits the [`Approver`] inline; a session without one answers these methods
//! with `4200 Unsupported method`.

use async_trait::async_trait;

/// A privileged action awaiting the user's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalRequest {
    /// `eth_requestAccounts`
    ConnectAccounts { accounts: Vec<String> },
    /// `wallet_addEthereumChain`
    AddChain {
        chain_id: u64,
        chain_name: Option<String>,
        rpc_urls: Vec<String>,
    },
    /// `wallet_switchEthereumChain`
    SwitchChain { chain_id: u64 },
    /// `wallet_requestPermissions`
    GrantPermissions { permissions: Vec<String> },
    /// `wallet_revokePermissions`
    RevokePermissions { permissions: Vec<String> },
}

impl ApprovalRequest {
    /// The provider method that raised this request.
    pub fn method(&self) -> &'static str {
        match self {
            ApprovalRequest::ConnectAccounts { .. } => "eth_requestAccounts",
            ApprovalRequest::AddChain { .. } => "wallet_addEthereumChain",
            ApprovalRequest::SwitchChain { .. } => "wallet_switchEthereumChain",
            ApprovalRequest::GrantPermissions { .. } => "wallet_requestPermissions",
            ApprovalRequest::RevokePermissions { .. } => "wallet_revokePermissions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    Approved,
    Rejected,
}

#[async_trait]
pub trait Approver: Send + Sync {
    async fn approve(&self, request: &ApprovalRequest) -> Approval;
}

/// Gives the same answer to every request.
#[derive(Debug, Clone, Copy)]
pub struct FixedApprover(pub Approval);

#[async_trait]
impl Approver for FixedApprover {
    async fn approve(&self, _request: &ApprovalRequest) -> Approval {
        self.0
    }
}
