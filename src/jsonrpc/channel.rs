// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Duplex message channel.

use tokio::sync::mpsc;

use super::Message;

/// Default per-direction buffer of [`Channel::pair`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// One end of a duplex link: messages arrive on `inward`, and are sent to the
/// peer through `outward`.
///
/// The same type is used for the frontend (dApp) link and the backend link.
/// Sending on a full `outward` queue waits, which makes it a backpressure
/// point for the owner.
#[derive(Debug)]
pub struct Channel {
    pub inward: mpsc::Receiver<Message>,
    pub outward: mpsc::Sender<Message>,
}

impl Channel {
    pub fn new(inward: mpsc::Receiver<Message>, outward: mpsc::Sender<Message>) -> Self {
        Self { inward, outward }
    }

    /// Two connected ends: what one sends, the other receives.
    pub fn pair(capacity: usize) -> (Channel, Channel) {
        let (a_tx, a_rx) = mpsc::channel(capacity);
        let (b_tx, b_rx) = mpsc::channel(capacity);
        (Channel::new(a_rx, b_tx), Channel::new(b_rx, a_tx))
    }

    pub async fn recv(&mut self) -> Option<Message> {
        self.inward.recv().await
    }

    /// Send to the peer. Returns the message back if the peer is gone.
    pub async fn send(&self, msg: Message) -> Result<(), Message> {
        self.outward.send(msg).await.map_err(|e| e.0)
    }
}
