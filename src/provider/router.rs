// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Provider session router.
//!
//! One router serves one dApp connection. It owns the session state and a
//! single event loop that handles, one at a time:
//!
//! - requests from the frontend (the dApp),
//! - responses and notifications from the backend,
//! - a periodic sweep that expires backend requests left unanswered.
//!
//! ## Dispatch
//!
//! Wallet-level methods (`eth_chainId`, `eth_accounts`, the `wallet_*`
//! family) are answered locally from the session. Methods that need a user
//! decision go through the configured [`Approver`]. Everything else is
//! forwarded to the backend under a router-local numeric id, and the
//! backend's response is relayed back under the caller's original id.
//!
//! ## Shutdown
//!
//! [`ProviderRouter::close`] cancels the loop and waits for it to exit.
//! Every outbound send races the same cancellation, so a stalled peer cannot
//! keep a closing session alive. Frontend end-of-stream or backend
//! disconnect also ends the session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ErrorCode, RpcError};
use crate::jsonrpc::{Channel, Id, Message};

use super::approval::{Approval, ApprovalRequest, Approver};
use super::events::{FrontendLink, ProviderEvents};
use super::session::{Session, ETH_ACCOUNTS_PERMISSION};
use super::settings::ProviderSettings;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("session loop did not exit within {0:?}")]
    CloseTimeout(Duration),

    #[error("session loop panicked: {0}")]
    Panicked(String),
}

/// Handle to a running provider session.
///
/// Dropping the handle cancels the session without waiting for it.
#[derive(Debug)]
pub struct ProviderRouter {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
    close_timeout: Duration,
}

impl ProviderRouter {
    /// Start a session between `frontend` and `backend`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        frontend: Channel,
        backend: Channel,
        settings: ProviderSettings,
        approver: Option<Arc<dyn Approver>>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let close_timeout = settings.close_timeout;
        let session = SessionLoop::new(frontend, backend, settings, approver, shutdown.clone());
        let task = tokio::spawn(session.run());
        Self {
            shutdown,
            task: Some(task),
            close_timeout,
        }
    }

    /// Whether the session loop has exited.
    pub fn is_closed(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the session and wait for its loop to exit.
    ///
    /// Safe to call more than once. If the loop does not exit within the
    /// close timeout it is aborted and `CloseTimeout` is returned.
    pub async fn close(&mut self) -> Result<(), RouterError> {
        self.shutdown.cancel();
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let abort = task.abort_handle();
        match tokio::time::timeout(self.close_timeout, task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.is_cancelled() => Ok(()),
            Ok(Err(e)) => Err(RouterError::Panicked(e.to_string())),
            Err(_) => {
                abort.abort();
                Err(RouterError::CloseTimeout(self.close_timeout))
            }
        }
    }
}

impl Drop for ProviderRouter {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ========== Session Loop ==========

/// A backend request awaiting its response.
#[derive(Debug)]
struct Pending {
    caller_id: Id,
    method: String,
    sent_at: Instant,
}

enum Event {
    Shutdown,
    Frontend(Option<Message>),
    Backend(Option<Message>),
    Sweep,
}

struct SessionLoop {
    frontend_rx: mpsc::Receiver<Message>,
    frontend: FrontendLink,
    backend: Channel,
    session: Session,
    settings: ProviderSettings,
    approver: Option<Arc<dyn Approver>>,
    pending: HashMap<i64, Pending>,
    next_backend_id: i64,
    shutdown: CancellationToken,
}

impl SessionLoop {
    fn new(
        frontend: Channel,
        backend: Channel,
        settings: ProviderSettings,
        approver: Option<Arc<dyn Approver>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            frontend_rx: frontend.inward,
            frontend: FrontendLink::new(frontend.outward, shutdown.clone()),
            backend,
            session: Session::new(&settings),
            settings,
            approver,
            pending: HashMap::new(),
            next_backend_id: 1,
            shutdown,
        }
    }

    async fn run(mut self) {
        info!(
            chain_id = self.session.chain_id(),
            accounts = self.session.accounts().len(),
            unlocked = self.session.is_unlocked(),
            "Provider session started"
        );

        let mut sweep = tokio::time::interval(sweep_period(self.settings.response_timeout));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Event::Shutdown,
                msg = self.frontend_rx.recv() => Event::Frontend(msg),
                msg = self.backend.inward.recv() => Event::Backend(msg),
                _ = sweep.tick() => Event::Sweep,
            };

            match event {
                Event::Shutdown => {
                    info!("Provider session shutting down");
                    break;
                }
                Event::Frontend(Some(msg)) => self.handle_frontend(msg).await,
                Event::Frontend(None) => {
                    info!("Frontend disconnected, closing session");
                    break;
                }
                Event::Backend(Some(msg)) => self.handle_backend(msg).await,
                Event::Backend(None) => {
                    warn!(pending = self.pending.len(), "Backend disconnected, closing session");
                    self.fail_pending(|| RpcError::annotated(ErrorCode::Disconnected, "backend disconnected"))
                        .await;
                    break;
                }
                Event::Sweep => self.expire_pending().await,
            }
        }

        self.shutdown.cancel();
        info!(dropped = self.pending.len(), "Provider session closed");
    }

    // ========== Frontend ==========

    async fn handle_frontend(&mut self, msg: Message) {
        let Some(id) = msg.id.clone() else {
            warn!(method = ?msg.method, "Dropping notification from frontend");
            return;
        };
        if !msg.is_request() {
            warn!(id = %id, "Rejecting non-request message from frontend");
            self.frontend
                .send(Message::error_for(id, RpcError::invalid_request("expected a request")))
                .await;
            return;
        }
        self.handle_request(id, msg).await
    }

    async fn handle_request(&mut self, caller_id: Id, req: Message) {
        let method = req.method().unwrap_or_default().to_owned();
        debug!(method = %method, "Dispatching request");

        let outcome = match method.as_str() {
            m if APPROVAL_METHODS.contains(&m) && self.approver.is_none() => {
                Err(approval_unavailable(m))
            }
            "web3_clientVersion" => Ok(json!(self.settings.client_version)),
            "eth_chainId" => Ok(json!(self.session.chain_id_hex())),
            "eth_accounts" => self.accounts(),
            "eth_requestAccounts" => self.request_accounts().await,
            "wallet_addEthereumChain" => self.add_chain(req.param(0)).await,
            "wallet_switchEthereumChain" => self.switch_chain(req.param(0)).await,
            "wallet_requestPermissions" => self.request_permissions(req.param(0)).await,
            "wallet_revokePermissions" => self.revoke_permissions(req.param(0)).await,
            "wallet_getPermissions" => Ok(self.session.permissions()),
            "wallet_registerOnboarding" => Err(RpcError::unsupported_method("no onboarding support")),
            "wallet_watchAsset" => Ok(Value::Bool(true)),
            "wallet_scanQRCode" => Err(RpcError::unsupported_method("no camera support")),
            _ => return self.forward(caller_id, req).await,
        };

        let reply = match outcome {
            Ok(result) => req.respond(result),
            Err(e) => {
                debug!(method = %method, error = %e, "Request failed");
                req.respond_err(e)
            }
        };
        self.frontend.send(reply).await;
    }

    fn accounts(&self) -> Result<Value, RpcError> {
        if !self.session.is_unlocked() {
            return Err(RpcError::unauthorized("account not unlocked"));
        }
        Ok(json!(self.session.accounts()))
    }

    async fn request_accounts(&mut self) -> Result<Value, RpcError> {
        if !self.session.is_unlocked() {
            self.ask(ApprovalRequest::ConnectAccounts {
                accounts: self.session.accounts().to_vec(),
            })
            .await?;
            self.unlock().await;
        }
        Ok(json!(self.session.accounts()))
    }

    async fn add_chain(&mut self, params: Option<&Value>) -> Result<Value, RpcError> {
        let chain_id = parse_chain_id(params)?;
        if self.session.knows_chain(chain_id) {
            return Ok(Value::Null);
        }
        let chain_name = params
            .and_then(|p| p.get("chainName"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        let rpc_urls = params
            .and_then(|p| p.get("rpcUrls"))
            .and_then(Value::as_array)
            .map(|urls| urls.iter().filter_map(Value::as_str).map(str::to_owned).collect())
            .unwrap_or_default();

        self.ask(ApprovalRequest::AddChain {
            chain_id,
            chain_name,
            rpc_urls,
        })
        .await?;
        self.session.add_chain(chain_id);
        info!(chain_id, "Chain added");
        Ok(Value::Null)
    }

    async fn switch_chain(&mut self, params: Option<&Value>) -> Result<Value, RpcError> {
        let chain_id = parse_chain_id(params)?;
        if chain_id == self.session.chain_id() {
            return Ok(Value::Null);
        }
        if !self.session.knows_chain(chain_id) {
            return Err(RpcError::annotated(
                ErrorCode::UnrecognizedChain,
                format!("chain {chain_id:#x} has not been added"),
            ));
        }

        self.ask(ApprovalRequest::SwitchChain { chain_id }).await?;
        if self.session.switch_chain(chain_id)? {
            info!(chain_id, "Active chain switched");
            self.frontend.change_chain(chain_id).await;
        }
        Ok(Value::Null)
    }

    async fn request_permissions(&mut self, params: Option<&Value>) -> Result<Value, RpcError> {
        let permissions = parse_permissions(params)?;
        self.ask(ApprovalRequest::GrantPermissions { permissions })
            .await?;
        self.unlock().await;
        Ok(self.session.permissions())
    }

    async fn revoke_permissions(&mut self, params: Option<&Value>) -> Result<Value, RpcError> {
        let permissions = parse_permissions(params)?;
        self.ask(ApprovalRequest::RevokePermissions { permissions })
            .await?;
        if self.session.lock() {
            info!("Session locked");
            self.frontend.change_state(false).await;
            self.frontend
                .change_account(self.session.visible_accounts())
                .await;
        }
        Ok(Value::Null)
    }

    async fn unlock(&mut self) {
        if self.session.unlock() {
            info!("Session unlocked");
            self.frontend.change_state(true).await;
            self.frontend
                .change_account(self.session.visible_accounts())
                .await;
        }
    }

    /// Await the user's decision on `request`.
    async fn ask(&self, request: ApprovalRequest) -> Result<(), RpcError> {
        let method = request.method();
        let Some(approver) = &self.approver else {
            return Err(approval_unavailable(method));
        };

        debug!(method, "Awaiting user approval");
        let decision = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                return Err(RpcError::annotated(ErrorCode::Disconnected, "session closing"));
            }
            decision = approver.approve(&request) => decision,
        };

        match decision {
            Approval::Approved => Ok(()),
            Approval::Rejected => {
                info!(method, "User rejected request");
                Err(RpcError::user_rejected(format!("{method} rejected")))
            }
        }
    }

    // ========== Backend ==========

    async fn forward(&mut self, caller_id: Id, req: Message) {
        let method = req.method().unwrap_or_default().to_owned();
        let backend_id = self.next_backend_id;
        self.next_backend_id += 1;

        let mut outbound = req;
        outbound.id = Some(Id::Number(backend_id));
        debug!(method = %method, id = %caller_id, backend_id, "Forwarding request to backend");

        let handoff = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return,
            sent = tokio::time::timeout(
                self.settings.forward_timeout,
                self.backend.outward.send(outbound),
            ) => sent,
        };

        let error = match handoff {
            Ok(Ok(())) => {
                self.pending.insert(
                    backend_id,
                    Pending {
                        caller_id,
                        method,
                        sent_at: Instant::now(),
                    },
                );
                return;
            }
            Ok(Err(_)) => {
                warn!(method = %method, "Backend receiver gone, cannot forward");
                RpcError::annotated(ErrorCode::Disconnected, "backend disconnected")
            }
            Err(_) => {
                warn!(
                    method = %method,
                    timeout_ms = self.settings.forward_timeout.as_millis() as u64,
                    "Backend did not accept request in time"
                );
                RpcError::resource_unavailable("backend did not accept the request in time")
            }
        };
        self.frontend.send(Message::error_for(caller_id, error)).await;
    }

    async fn handle_backend(&mut self, msg: Message) {
        if msg.is_notification() {
            self.frontend.send(msg).await;
            return;
        }
        if !msg.is_response() {
            warn!(method = ?msg.method, "Dropping unexpected message from backend");
            return;
        }

        let pending = match &msg.id {
            Some(Id::Number(n)) => self.pending.remove(n),
            _ => None,
        };
        let Some(pending) = pending else {
            warn!(id = ?msg.id, "Dropping backend response with unknown id");
            return;
        };

        debug!(
            method = %pending.method,
            id = %pending.caller_id,
            elapsed_ms = pending.sent_at.elapsed().as_millis() as u64,
            "Relaying backend response"
        );
        let mut reply = msg;
        reply.id = Some(pending.caller_id);
        self.frontend.send(reply).await;
    }

    async fn expire_pending(&mut self) {
        let timeout = self.settings.response_timeout;
        let mut expired: Vec<i64> = self
            .pending
            .iter()
            .filter(|(_, p)| p.sent_at.elapsed() >= timeout)
            .map(|(id, _)| *id)
            .collect();
        expired.sort_unstable();

        for backend_id in expired {
            let Some(p) = self.pending.remove(&backend_id) else {
                continue;
            };
            warn!(method = %p.method, id = %p.caller_id, backend_id, "Backend response timed out");
            self.frontend
                .send(Message::error_for(
                    p.caller_id,
                    RpcError::resource_unavailable("backend did not respond in time"),
                ))
                .await;
        }
    }

    async fn fail_pending(&mut self, error: impl Fn() -> RpcError) {
        let mut pending: Vec<(i64, Pending)> = self.pending.drain().collect();
        pending.sort_unstable_by_key(|(id, _)| *id);
        for (_, p) in pending {
            self.frontend.send(Message::error_for(p.caller_id, error())).await;
        }
    }
}

/// Methods answered only after a user decision. Without an approver they
/// fail up front, before any shortcut could answer them.
const APPROVAL_METHODS: [&str; 5] = [
    "eth_requestAccounts",
    "wallet_addEthereumChain",
    "wallet_switchEthereumChain",
    "wallet_requestPermissions",
    "wallet_revokePermissions",
];

fn approval_unavailable(method: &str) -> RpcError {
    RpcError::unsupported_method(format!("{method} requires user approval"))
}

fn sweep_period(response_timeout: Duration) -> Duration {
    (response_timeout / 4).max(Duration::from_millis(10))
}

/// `chainId` of the first positional parameter, a hex quantity.
fn parse_chain_id(params: Option<&Value>) -> Result<u64, RpcError> {
    let raw = params
        .and_then(|p| p.get("chainId"))
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params("missing chainId"))?;
    raw.strip_prefix("0x")
        .and_then(|digits| u64::from_str_radix(digits, 16).ok())
        .ok_or_else(|| RpcError::invalid_params(format!("chainId {raw:?} is not a hex quantity")))
}

/// Permission names requested in an EIP-2255 permission object.
fn parse_permissions(params: Option<&Value>) -> Result<Vec<String>, RpcError> {
    let requested = params
        .and_then(Value::as_object)
        .filter(|o| !o.is_empty())
        .ok_or_else(|| RpcError::invalid_params("expected a permission object"))?;
    let names: Vec<String> = requested.keys().cloned().collect();
    if let Some(other) = names.iter().find(|n| n.as_str() != ETH_ACCOUNTS_PERMISSION) {
        return Err(RpcError::invalid_params(format!("unknown permission {other}")));
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::approval::FixedApprover;
    use crate::provider::events::{ACCOUNTS_CHANGED, CHAIN_CHANGED, UNLOCK_STATE_CHANGED};
    use std::sync::Mutex;

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";

    struct Harness {
        router: ProviderRouter,
        dapp: Channel,
        backend: Channel,
    }

    fn settings() -> ProviderSettings {
        ProviderSettings::new(1, vec![ALICE.to_string(), BOB.to_string()]).with_known_chains([10])
    }

    fn start(settings: ProviderSettings, approver: Option<Arc<dyn Approver>>) -> Harness {
        start_with_capacity(settings, approver, 16)
    }

    fn start_with_capacity(
        settings: ProviderSettings,
        approver: Option<Arc<dyn Approver>>,
        backend_capacity: usize,
    ) -> Harness {
        let (dapp, frontend) = Channel::pair(16);
        let (backend_peer, backend) = Channel::pair(backend_capacity);
        Harness {
            router: ProviderRouter::spawn(frontend, backend, settings, approver),
            dapp,
            backend: backend_peer,
        }
    }

    async fn next(ch: &mut Channel) -> Message {
        tokio::time::timeout(Duration::from_secs(2), ch.recv())
            .await
            .expect("timed out waiting for message")
            .expect("channel closed")
    }

    impl Harness {
        async fn call(&mut self, id: i64, method: &str, params: Option<Value>) -> Message {
            self.dapp
                .send(Message::request(id, method, params))
                .await
                .unwrap();
            next(&mut self.dapp).await
        }
    }

    /// Approver that records what it was asked.
    struct Recording {
        decision: Approval,
        seen: Mutex<Vec<ApprovalRequest>>,
    }

    impl Recording {
        fn new(decision: Approval) -> Arc<Self> {
            Arc::new(Self {
                decision,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<ApprovalRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Approver for Recording {
        async fn approve(&self, request: &ApprovalRequest) -> Approval {
            self.seen.lock().unwrap().push(request.clone());
            self.decision
        }
    }

    struct Stalled;

    #[async_trait::async_trait]
    impl Approver for Stalled {
        async fn approve(&self, _request: &ApprovalRequest) -> Approval {
            std::future::pending().await
        }
    }

    fn code(msg: &Message) -> i64 {
        msg.error.as_ref().expect("expected an error response").code
    }

    // ========== Local dispatch ==========

    #[tokio::test]
    async fn answers_identity_methods_locally() {
        let mut h = start(
            ProviderSettings::new(10, vec![]).with_client_version("test/v1"),
            None,
        );

        let resp = h.call(1, "web3_clientVersion", None).await;
        assert_eq!(resp.result, Some(json!("test/v1")));

        let resp = h.call(2, "eth_chainId", None).await;
        assert_eq!(resp.id, Some(Id::Number(2)));
        assert_eq!(resp.result, Some(json!("0xa")));

        let resp = h.call(3, "wallet_watchAsset", Some(json!({"type": "ERC20"}))).await;
        assert_eq!(resp.result, Some(json!(true)));

        assert!(h.backend.inward.try_recv().is_err());
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn accounts_are_gated_on_unlock() {
        let mut h = start(settings(), None);
        let resp = h.call(1, "eth_accounts", None).await;
        assert_eq!(code(&resp), 4100);
        assert_eq!(resp.error.unwrap().cause(), Some("account not unlocked"));

        let resp = h.call(2, "wallet_getPermissions", None).await;
        assert_eq!(resp.result, Some(json!([])));
        h.router.close().await.unwrap();

        let mut h = start(settings().unlocked(true), None);
        let resp = h.call(1, "eth_accounts", None).await;
        assert_eq!(resp.result, Some(json!([ALICE, BOB])));

        let resp = h.call(2, "wallet_getPermissions", None).await;
        let perms = resp.result.unwrap();
        assert_eq!(perms[0]["parentCapability"], "eth_accounts");
        assert_eq!(perms[0]["caveats"][0]["value"], json!([ALICE, BOB]));
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn onboarding_and_qr_are_never_supported() {
        for unlocked in [false, true] {
            let mut h = start(settings().unlocked(unlocked), None);
            let resp = h.call(1, "wallet_registerOnboarding", None).await;
            assert_eq!(code(&resp), 4200);
            let resp = h.call(2, "wallet_scanQRCode", Some(json!([]))).await;
            assert_eq!(code(&resp), 4200);
            assert_eq!(resp.error.unwrap().cause(), Some("no camera support"));
            h.router.close().await.unwrap();
        }
    }

    #[tokio::test]
    async fn malformed_frontend_messages() {
        let mut h = start(settings(), None);

        let stray = Message::request(5i64, "x", None).respond(1);
        h.dapp.send(stray).await.unwrap();
        let resp = next(&mut h.dapp).await;
        assert_eq!(resp.id, Some(Id::Number(5)));
        assert_eq!(code(&resp), -32600);

        // Notifications are dropped without reply.
        h.dapp.send(Message::notification("eth_chainId", None)).await.unwrap();
        let resp = h.call(6, "eth_chainId", None).await;
        assert_eq!(resp.id, Some(Id::Number(6)));
        h.router.close().await.unwrap();
    }

    // ========== Approval ==========

    #[tokio::test]
    async fn approval_methods_fail_without_approver() {
        let mut h = start(settings(), None);
        let calls = [
            ("eth_requestAccounts", None),
            ("wallet_switchEthereumChain", Some(json!([{"chainId": "0xa"}]))),
            ("wallet_addEthereumChain", Some(json!([{"chainId": "0x2105"}]))),
            // Already active / already known: still no answer without approval.
            ("wallet_switchEthereumChain", Some(json!([{"chainId": "0x1"}]))),
            ("wallet_addEthereumChain", Some(json!([{"chainId": "0xa"}]))),
            ("wallet_requestPermissions", Some(json!([{"eth_accounts": {}}]))),
            ("wallet_revokePermissions", Some(json!([{"eth_accounts": {}}]))),
        ];
        for (i, (method, params)) in calls.into_iter().enumerate() {
            let resp = h.call(i as i64, method, params).await;
            assert_eq!(code(&resp), 4200, "{method}");
        }

        let resp = h.call(10, "eth_accounts", None).await;
        assert_eq!(code(&resp), 4100);
        let resp = h.call(11, "eth_chainId", None).await;
        assert_eq!(resp.result, Some(json!("0x1")));
        h.router.close().await.unwrap();

        let mut h = start(settings().unlocked(true), None);
        let resp = h.call(1, "eth_requestAccounts", None).await;
        assert_eq!(code(&resp), 4200);
        assert_eq!(
            resp.error.unwrap().cause(),
            Some("eth_requestAccounts requires user approval")
        );
        let resp = h.call(2, "eth_accounts", None).await;
        assert_eq!(resp.result, Some(json!([ALICE, BOB])));
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn frontend_ids_survive_dispatch() {
        let mut h = start(settings(), None);

        // Error replies, local answers and forwarded calls all keep the caller's id.
        let resp = h
            .call(1, "wallet_switchEthereumChain", Some(json!([{"chainId": "0x1"}])))
            .await;
        assert_eq!(resp.id, Some(Id::Number(1)));

        h.dapp
            .send(Message::request("fwd", "eth_gasPrice", None))
            .await
            .unwrap();
        let forwarded = next(&mut h.backend).await;
        assert_ne!(forwarded.id, Some(Id::String("fwd".to_string())));
        h.backend.send(forwarded.respond("0x1")).await.unwrap();
        let resp = next(&mut h.dapp).await;
        assert_eq!(resp.id, Some(Id::String("fwd".to_string())));
        assert_eq!(resp.result, Some(json!("0x1")));
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_connect_keeps_session_locked() {
        let mut h = start(settings(), Some(Arc::new(FixedApprover(Approval::Rejected))));
        let resp = h.call(1, "eth_requestAccounts", None).await;
        assert_eq!(code(&resp), 4001);

        let resp = h.call(2, "eth_accounts", None).await;
        assert_eq!(code(&resp), 4100);
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn approved_connect_unlocks_and_notifies() {
        let approver = Recording::new(Approval::Approved);
        let mut h = start(settings(), Some(approver.clone() as Arc<dyn Approver>));

        h.dapp
            .send(Message::request(1i64, "eth_requestAccounts", None))
            .await
            .unwrap();

        let state = next(&mut h.dapp).await;
        assert_eq!(state.method(), Some(UNLOCK_STATE_CHANGED));
        assert_eq!(state.params.unwrap()["isUnlocked"], true);
        let accounts = next(&mut h.dapp).await;
        assert_eq!(accounts.method(), Some(ACCOUNTS_CHANGED));
        assert_eq!(accounts.params, Some(json!([ALICE, BOB])));
        let resp = next(&mut h.dapp).await;
        assert_eq!(resp.id, Some(Id::Number(1)));
        assert_eq!(resp.result, Some(json!([ALICE, BOB])));

        let resp = h.call(2, "eth_accounts", None).await;
        assert_eq!(resp.result, Some(json!([ALICE, BOB])));

        // Already connected: no second prompt.
        let resp = h.call(3, "eth_requestAccounts", None).await;
        assert_eq!(resp.result, Some(json!([ALICE, BOB])));
        assert_eq!(
            approver.seen(),
            vec![ApprovalRequest::ConnectAccounts {
                accounts: vec![ALICE.to_string(), BOB.to_string()],
            }]
        );
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn switch_and_add_chains() {
        let approver = Recording::new(Approval::Approved);
        let mut h = start(settings(), Some(approver.clone() as Arc<dyn Approver>));

        h.dapp
            .send(Message::request(
                1i64,
                "wallet_switchEthereumChain",
                Some(json!([{"chainId": "0xa"}])),
            ))
            .await
            .unwrap();
        let changed = next(&mut h.dapp).await;
        assert_eq!(changed.method(), Some(CHAIN_CHANGED));
        assert_eq!(changed.params.unwrap()["chainId"], "0xa");
        let resp = next(&mut h.dapp).await;
        assert_eq!(resp.result, Some(Value::Null));

        let resp = h.call(2, "eth_chainId", None).await;
        assert_eq!(resp.result, Some(json!("0xa")));

        // Unknown chain fails before prompting.
        let resp = h
            .call(3, "wallet_switchEthereumChain", Some(json!([{"chainId": "0x2105"}])))
            .await;
        assert_eq!(code(&resp), 4902);

        let resp = h
            .call(
                4,
                "wallet_addEthereumChain",
                Some(json!([{
                    "chainId": "0x2105",
                    "chainName": "Base",
                    "rpcUrls": ["https://base.example"],
                }])),
            )
            .await;
        assert_eq!(resp.result, Some(Value::Null));

        h.dapp
            .send(Message::request(
                5i64,
                "wallet_switchEthereumChain",
                Some(json!([{"chainId": "0x2105"}])),
            ))
            .await
            .unwrap();
        assert_eq!(next(&mut h.dapp).await.method(), Some(CHAIN_CHANGED));
        assert_eq!(next(&mut h.dapp).await.id, Some(Id::Number(5)));

        assert_eq!(
            approver.seen(),
            vec![
                ApprovalRequest::SwitchChain { chain_id: 10 },
                ApprovalRequest::AddChain {
                    chain_id: 0x2105,
                    chain_name: Some("Base".to_string()),
                    rpc_urls: vec!["https://base.example".to_string()],
                },
                ApprovalRequest::SwitchChain { chain_id: 0x2105 },
            ]
        );
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn permissions_grant_and_revoke() {
        let mut h = start(settings(), Some(Arc::new(FixedApprover(Approval::Approved))));

        h.dapp
            .send(Message::request(
                1i64,
                "wallet_requestPermissions",
                Some(json!([{"eth_accounts": {}}])),
            ))
            .await
            .unwrap();
        assert_eq!(next(&mut h.dapp).await.method(), Some(UNLOCK_STATE_CHANGED));
        assert_eq!(next(&mut h.dapp).await.method(), Some(ACCOUNTS_CHANGED));
        let resp = next(&mut h.dapp).await;
        assert_eq!(resp.result.unwrap()[0]["parentCapability"], "eth_accounts");

        h.dapp
            .send(Message::request(
                2i64,
                "wallet_revokePermissions",
                Some(json!([{"eth_accounts": {}}])),
            ))
            .await
            .unwrap();
        let state = next(&mut h.dapp).await;
        assert_eq!(state.params.unwrap()["isUnlocked"], false);
        let accounts = next(&mut h.dapp).await;
        assert_eq!(accounts.params, Some(json!([])));
        let resp = next(&mut h.dapp).await;
        assert_eq!(resp.result, Some(Value::Null));

        let resp = h.call(3, "eth_accounts", None).await;
        assert_eq!(code(&resp), 4100);
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn approval_params_are_validated() {
        let mut h = start(settings(), Some(Arc::new(FixedApprover(Approval::Approved))));

        let resp = h.call(1, "wallet_switchEthereumChain", Some(json!([{}]))).await;
        assert_eq!(code(&resp), -32602);
        let resp = h
            .call(2, "wallet_switchEthereumChain", Some(json!([{"chainId": "10"}])))
            .await;
        assert_eq!(code(&resp), -32602);
        let resp = h
            .call(3, "wallet_requestPermissions", Some(json!([{"eth_sign": {}}])))
            .await;
        assert_eq!(code(&resp), -32602);
        h.router.close().await.unwrap();
    }

    // ========== Forwarding ==========

    #[tokio::test]
    async fn forwards_unknown_methods_and_relays_by_caller_id() {
        let mut h = start(settings(), None);

        let params = json!(["0xdeadbeef"]);
        h.dapp
            .send(Message::request("abc", "eth_sendRawTransaction", Some(params.clone())))
            .await
            .unwrap();

        let forwarded = next(&mut h.backend).await;
        assert_eq!(forwarded.method(), Some("eth_sendRawTransaction"));
        assert_eq!(forwarded.params, Some(params));
        assert!(matches!(forwarded.id, Some(Id::Number(_))));

        h.backend.send(forwarded.respond("0xhash")).await.unwrap();
        let resp = next(&mut h.dapp).await;
        assert_eq!(resp.id, Some(Id::String("abc".to_string())));
        assert_eq!(resp.result, Some(json!("0xhash")));
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn out_of_order_backend_responses() {
        let mut h = start(settings(), None);
        h.dapp
            .send(Message::request(1i64, "eth_getBalance", None))
            .await
            .unwrap();
        h.dapp
            .send(Message::request(2i64, "eth_blockNumber", None))
            .await
            .unwrap();

        let first = next(&mut h.backend).await;
        let second = next(&mut h.backend).await;
        assert_ne!(first.id, second.id);

        h.backend.send(second.respond("0x10")).await.unwrap();
        h.backend.send(first.respond("0x0")).await.unwrap();

        let resp = next(&mut h.dapp).await;
        assert_eq!((resp.id, resp.result), (Some(Id::Number(2)), Some(json!("0x10"))));
        let resp = next(&mut h.dapp).await;
        assert_eq!((resp.id, resp.result), (Some(Id::Number(1)), Some(json!("0x0"))));
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn relays_backend_notifications_untouched() {
        let mut h = start(settings(), None);
        let note = Message::notification(
            "eth_subscription",
            Some(json!({"subscription": "0x1", "result": {"number": "0x10"}})),
        );
        h.backend.send(note.clone()).await.unwrap();
        assert_eq!(next(&mut h.dapp).await, note);

        // Unknown ids are dropped, the session keeps going.
        h.backend
            .send(Message::request(999i64, "x", None).respond(1))
            .await
            .unwrap();
        let resp = h.call(1, "eth_chainId", None).await;
        assert_eq!(resp.id, Some(Id::Number(1)));
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn stalled_backend_handoff_times_out() {
        let mut h = start_with_capacity(
            settings().with_timeouts(Duration::from_millis(50), Duration::from_secs(30)),
            None,
            1,
        );

        // Fills the backend queue; nobody reads it.
        h.dapp
            .send(Message::request(1i64, "eth_call", None))
            .await
            .unwrap();
        let resp = h.call(2, "eth_call", None).await;
        assert_eq!(resp.id, Some(Id::Number(2)));
        assert_eq!(code(&resp), -32002);

        // Locally answered methods still work.
        let resp = h.call(3, "eth_chainId", None).await;
        assert_eq!(resp.result, Some(json!("0x1")));
        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn unanswered_backend_request_expires() {
        let mut h = start(
            settings().with_timeouts(Duration::from_secs(5), Duration::from_millis(100)),
            None,
        );

        h.dapp
            .send(Message::request("slow", "eth_call", None))
            .await
            .unwrap();
        let forwarded = next(&mut h.backend).await;

        let resp = next(&mut h.dapp).await;
        assert_eq!(resp.id, Some(Id::String("slow".to_string())));
        assert_eq!(code(&resp), -32002);

        // A late answer no longer matches anything.
        h.backend.send(forwarded.respond("0x")).await.unwrap();
        let resp = h.call(2, "eth_chainId", None).await;
        assert_eq!(resp.id, Some(Id::Number(2)));
        h.router.close().await.unwrap();
    }

    // ========== Shutdown ==========

    #[tokio::test]
    async fn close_stops_delivery_on_both_channels() {
        let mut h = start(settings(), None);
        let resp = h.call(1, "eth_chainId", None).await;
        assert!(resp.is_response());

        h.router.close().await.unwrap();
        assert!(h.router.is_closed());
        assert!(h.dapp.recv().await.is_none());
        assert!(h.backend.recv().await.is_none());
        assert!(h
            .dapp
            .send(Message::request(2i64, "eth_chainId", None))
            .await
            .is_err());

        h.router.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_interrupts_pending_approval() {
        let mut h = start(settings(), Some(Arc::new(Stalled)));
        h.dapp
            .send(Message::request(1i64, "eth_requestAccounts", None))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(2), h.router.close())
            .await
            .expect("close must be bounded")
            .unwrap();
        assert!(h.dapp.recv().await.is_none());
    }

    #[tokio::test]
    async fn frontend_end_of_stream_closes_session() {
        let Harness {
            mut router,
            dapp,
            mut backend,
        } = start(settings(), None);
        drop(dapp);

        let end = tokio::time::timeout(Duration::from_secs(2), backend.recv())
            .await
            .expect("session should end");
        assert!(end.is_none());
        router.close().await.unwrap();
    }

    #[tokio::test]
    async fn backend_disconnect_fails_pending_and_closes() {
        let mut h = start(settings(), None);
        h.dapp
            .send(Message::request(7i64, "eth_call", None))
            .await
            .unwrap();
        let _ = next(&mut h.backend).await;
        drop(h.backend);

        let resp = next(&mut h.dapp).await;
        assert_eq!(resp.id, Some(Id::Number(7)));
        assert_eq!(code(&resp), 4900);
        assert!(h.dapp.recv().await.is_none());
        h.router.close().await.unwrap();
    }

    #[test]
    fn chain_id_params() {
        assert_eq!(parse_chain_id(Some(&json!({"chainId": "0x2105"}))), Ok(8453));
        assert!(parse_chain_id(Some(&json!({"chainId": "0x"}))).is_err());
        assert!(parse_chain_id(None).is_err());
    }
}
