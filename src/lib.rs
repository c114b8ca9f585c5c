// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet Router - Provider Session Router and Resource Graph
//!
//! This crate sits between a dApp speaking the injected-provider JSON-RPC
//! dialect and the wallet's backend. Session queries are answered locally,
//! privileged methods go through user approval, and everything else is
//! forwarded to the backend.
//!
//! ## Modules
//!
//! - `config` - Environment-driven runtime configuration
//! - `error` - JSON-RPC error codes surfaced to peers
//! - `jsonrpc` - Message units and duplex channels
//! - `provider` - Per-connection session router
//! - `resources` - Typed YAML configuration graph (chains, RPCs, accounts)

pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod provider;
pub mod resources;
