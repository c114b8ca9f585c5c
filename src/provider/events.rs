// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session events pushed to the dApp as notifications.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::jsonrpc::Message;

pub const ACCOUNTS_CHANGED: &str = "metamask_accountsChanged";
pub const CHAIN_CHANGED: &str = "metamask_chainChanged";
pub const UNLOCK_STATE_CHANGED: &str = "metamask_unlockStateChanged";

/// Outbound notifications emitted on session state changes.
#[async_trait]
pub trait ProviderEvents: Send + Sync {
    async fn change_account(&self, accounts: &[String]);

    async fn change_chain(&self, chain_id: u64);

    async fn change_state(&self, unlocked: bool);
}

/// Sending half of the dApp-facing channel.
///
/// Every send races the session's shutdown token, so a full channel never
/// holds up a closing session.
#[derive(Debug, Clone)]
pub struct FrontendLink {
    outward: mpsc::Sender<Message>,
    shutdown: CancellationToken,
}

impl FrontendLink {
    pub fn new(outward: mpsc::Sender<Message>, shutdown: CancellationToken) -> Self {
        Self { outward, shutdown }
    }

    /// Returns whether the message was delivered.
    pub async fn send(&self, msg: Message) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                debug!("Session closing, dropping outbound message");
                false
            }
            sent = self.outward.send(msg) => match sent {
                Ok(()) => true,
                Err(_) => {
                    warn!("Frontend receiver gone, dropping outbound message");
                    false
                }
            },
        }
    }
}

#[async_trait]
impl ProviderEvents for FrontendLink {
    async fn change_account(&self, accounts: &[String]) {
        self.send(Message::notification(ACCOUNTS_CHANGED, Some(json!(accounts))))
            .await;
    }

    async fn change_chain(&self, chain_id: u64) {
        let params = json!({
            "chainId": format!("{chain_id:#x}"),
            "networkVersion": chain_id.to_string(),
        });
        self.send(Message::notification(CHAIN_CHANGED, Some(params)))
            .await;
    }

    async fn change_state(&self, unlocked: bool) {
        self.send(Message::notification(
            UNLOCK_STATE_CHANGED,
            Some(json!({ "isUnlocked": unlocked })),
        ))
        .await;
    }
}
