// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! dApp-facing provider sessions.
//!
//! A [`ProviderRouter`] sits between one dApp connection (frontend) and the
//! node transport (backend), both carried over [`crate::jsonrpc::Channel`]s.

pub mod approval;
pub mod events;
pub mod info;
pub mod router;
pub mod session;
pub mod settings;

pub use approval::{Approval, ApprovalRequest, Approver, FixedApprover};
pub use events::{FrontendLink, ProviderEvents};
pub use info::{ProviderInfo, DEFAULT_RDNS};
pub use router::{ProviderRouter, RouterError};
pub use session::Session;
pub use settings::ProviderSettings;
