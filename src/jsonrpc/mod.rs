// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC 2.0 messages and the duplex channel they travel on.
//!
//! The wire transport (websocket framing etc.) lives outside this crate.
//! Everything inside the crate only sees [`Channel`] ends carrying
//! already-decoded [`Message`]s.

pub mod channel;
pub mod message;

pub use channel::{Channel, DEFAULT_CHANNEL_CAPACITY};
pub use message::{Id, Message, JSONRPC_VERSION};
