// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource kinds and their reference edges.

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::Address;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use super::{LoadContext, MethodMatcher, Resource, ResourceError, ResourceKind, ResourceRef};

fn check_address(ctx: &LoadContext<'_>, field: &str, address: &str) -> Result<(), ResourceError> {
    Address::from_str(address)
        .map(|_| ())
        .map_err(|e| ctx.invalid(format!("{field} {address:?} is not an address: {e}")))
}

fn check_url(ctx: &LoadContext<'_>, field: &str, endpoint: &str) -> Result<(), ResourceError> {
    url::Url::parse(endpoint)
        .map(|_| ())
        .map_err(|e| ctx.invalid(format!("{field} {endpoint:?} is not a URL: {e}")))
}

fn check_matcher(
    ctx: &LoadContext<'_>,
    field: &str,
    matcher: &MethodMatcher,
) -> Result<(), ResourceError> {
    if matcher.is_valid() {
        Ok(())
    } else {
        Err(ctx.invalid(format!("{field} has an empty method matcher")))
    }
}

/// Optional reference where an empty string counts as unset.
fn optional_ref<'de, D, R>(deserializer: D) -> Result<Option<ResourceRef<R>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|id| !id.trim().is_empty()).map(ResourceRef::new))
}

// ========== Chains ==========

/// Native currency of a chain.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Currency {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Resource for Currency {
    const KIND: ResourceKind = ResourceKind::Currency;
}

/// Block explorer for a chain.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Explorer {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub endpoint: String,
    pub chain: ResourceRef<Chain>,
}

impl Resource for Explorer {
    const KIND: ResourceKind = ResourceKind::Explorer;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        check_url(ctx, "endpoint", &self.endpoint)?;
        ctx.resolve("chain", &mut self.chain)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Chain {
    pub name: String,
    #[serde(alias = "chainid")]
    pub chain_id: u64,
    #[serde(alias = "networkid")]
    pub network_id: u64,
    pub currency: ResourceRef<Currency>,
}

impl Resource for Chain {
    const KIND: ResourceKind = ResourceKind::Chain;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        ctx.resolve("currency", &mut self.currency)
    }
}

// ========== RPC Endpoints ==========

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcVendor {
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

impl Resource for RpcVendor {
    const KIND: ResourceKind = ResourceKind::RpcVendor;
}

/// Requests-per-second budget for methods matching `matcher`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodRateLimit {
    pub matcher: MethodMatcher,
    pub limit: u32,
}

/// A single upstream JSON-RPC endpoint.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rpc {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub vendor: ResourceRef<RpcVendor>,
    pub chain: ResourceRef<Chain>,
    /// Supported methods. Empty means every method.
    #[serde(default)]
    pub methods: Vec<MethodMatcher>,
    #[serde(default, alias = "engineauth")]
    pub engine_auth: Option<String>,
    pub endpoint: String,
    #[serde(default, alias = "ratelimit")]
    pub rate_limits: Vec<MethodRateLimit>,
    #[serde(default, alias = "adminpanel")]
    pub admin_panel: Option<String>,
}

impl Rpc {
    pub fn supports(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m.matches(method))
    }

    /// Budget of the first rate limit matching `method`.
    pub fn rate_limit(&self, method: &str) -> Option<u32> {
        self.rate_limits
            .iter()
            .find(|rl| rl.matcher.matches(method))
            .map(|rl| rl.limit)
    }
}

impl Resource for Rpc {
    const KIND: ResourceKind = ResourceKind::Rpc;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        check_url(ctx, "endpoint", &self.endpoint)?;
        for (i, m) in self.methods.iter().enumerate() {
            check_matcher(ctx, &format!("methods[{i}]"), m)?;
        }
        for (i, rl) in self.rate_limits.iter().enumerate() {
            check_matcher(ctx, &format!("rate_limits[{i}]"), &rl.matcher)?;
        }
        ctx.resolve("vendor", &mut self.vendor)?;
        ctx.resolve("chain", &mut self.chain)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodForward {
    pub matcher: MethodMatcher,
    pub forward: ResourceRef<Rpc>,
}

/// Ordered method-matcher -> RPC forwarding rules.
///
/// Rules are tried in order and the first match wins.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeRpc {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub methods: Vec<MethodForward>,
}

impl CompositeRpc {
    pub fn route(&self, method: &str) -> Option<&MethodForward> {
        self.methods.iter().find(|m| m.matcher.matches(method))
    }

    /// The RPC that `method` is forwarded to.
    pub fn backend_for(&self, method: &str) -> Option<&Arc<Rpc>> {
        self.route(method)?.forward.get()
    }
}

impl Resource for CompositeRpc {
    const KIND: ResourceKind = ResourceKind::CompositeRpc;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        for (i, m) in self.methods.iter_mut().enumerate() {
            check_matcher(ctx, &format!("methods[{i}]"), &m.matcher)?;
            ctx.resolve(&format!("methods[{i}].forward"), &mut m.forward)?;
        }
        Ok(())
    }
}

/// The configuration served to one dApp-facing provider.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderRpc {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub backend: ResourceRef<CompositeRpc>,
    #[serde(default)]
    pub accounts: Vec<ResourceRef<Account>>,
    /// Generated at load time; distinguishes sessions sharing a backend.
    #[serde(skip)]
    pub session_id: Uuid,
}

impl ProviderRpc {
    /// Addresses of the configured accounts, in configuration order.
    pub fn addresses(&self) -> Vec<String> {
        self.accounts
            .iter()
            .filter_map(|a| a.get())
            .map(|a| a.address.clone())
            .collect()
    }

    /// Chain of the first backend forward.
    pub fn default_chain(&self) -> Option<Arc<Chain>> {
        let backend = self.backend.get()?;
        backend
            .methods
            .iter()
            .filter_map(|m| m.forward.get())
            .find_map(|rpc| rpc.chain.get().cloned())
    }

    /// Every chain reachable through the backend, without duplicates.
    pub fn chains(&self) -> Vec<Arc<Chain>> {
        let mut chains: Vec<Arc<Chain>> = Vec::new();
        let Some(backend) = self.backend.get() else {
            return chains;
        };
        for rpc in backend.methods.iter().filter_map(|m| m.forward.get()) {
            if let Some(chain) = rpc.chain.get() {
                if !chains.iter().any(|c| Arc::ptr_eq(c, chain)) {
                    chains.push(chain.clone());
                }
            }
        }
        chains
    }
}

impl Resource for ProviderRpc {
    const KIND: ResourceKind = ResourceKind::ProviderRpc;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        ctx.resolve("backend", &mut self.backend)?;
        for (i, account) in self.accounts.iter_mut().enumerate() {
            ctx.resolve(&format!("accounts[{i}]"), account)?;
        }
        self.session_id = Uuid::new_v4();
        Ok(())
    }
}

// ========== Accounts ==========

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Account {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl Resource for Account {
    const KIND: ResourceKind = ResourceKind::Account;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        check_address(ctx, "address", &self.address)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Wallet {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub accounts: Vec<ResourceRef<Account>>,
}

impl Resource for Wallet {
    const KIND: ResourceKind = ResourceKind::Wallet;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        for (i, account) in self.accounts.iter_mut().enumerate() {
            ctx.resolve(&format!("accounts[{i}]"), account)?;
        }
        Ok(())
    }
}

// ========== Signing ==========

/// Signing device selected for methods matching `matcher`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Signer {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub matcher: MethodMatcher,
    pub hardware: ResourceRef<Hardware>,
}

impl Signer {
    pub fn handles(&self, method: &str) -> bool {
        self.matcher.matches(method)
    }
}

impl Resource for Signer {
    const KIND: ResourceKind = ResourceKind::Signer;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        check_matcher(ctx, "matcher", &self.matcher)?;
        ctx.resolve("hardware", &mut self.hardware)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hardware {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub hardware_type: String,
}

impl Resource for Hardware {
    const KIND: ResourceKind = ResourceKind::Hardware;
}

// ========== Contracts & Tokens ==========

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractAbi {
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub abi_type: String,
}

impl Resource for ContractAbi {
    const KIND: ResourceKind = ResourceKind::ContractAbi;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        check_address(ctx, "address", &self.address)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenErc20 {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub symbol: String,
    pub decimals: u8,
    pub address: String,
    pub chain: ResourceRef<Chain>,
}

impl Resource for TokenErc20 {
    const KIND: ResourceKind = ResourceKind::TokenErc20;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        check_address(ctx, "address", &self.address)?;
        ctx.resolve("chain", &mut self.chain)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenErc721 {
    pub name: String,
    pub address: String,
    #[serde(alias = "tokenid")]
    pub token_id: String,
    pub chain: ResourceRef<Chain>,
}

impl Resource for TokenErc721 {
    const KIND: ResourceKind = ResourceKind::TokenErc721;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        check_address(ctx, "address", &self.address)?;
        ctx.resolve("chain", &mut self.chain)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenErc1155 {
    pub name: String,
    pub address: String,
    #[serde(alias = "tokenid")]
    pub token_id: String,
    pub chain: ResourceRef<Chain>,
}

impl Resource for TokenErc1155 {
    const KIND: ResourceKind = ResourceKind::TokenErc1155;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        check_address(ctx, "address", &self.address)?;
        ctx.resolve("chain", &mut self.chain)
    }
}

// ========== Holdings ==========

/// What a holding tracks.
#[derive(Debug, Clone, Copy)]
pub enum HoldingAsset<'a> {
    Token(&'a Arc<TokenErc20>),
    Currency(&'a Arc<Currency>),
}

/// Balance of one asset held by one account.
///
/// Exactly one of `token` and `currency` must be set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Holding {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub account: ResourceRef<Account>,
    #[serde(default, deserialize_with = "optional_ref")]
    pub token: Option<ResourceRef<TokenErc20>>,
    #[serde(default, deserialize_with = "optional_ref")]
    pub currency: Option<ResourceRef<Currency>>,
}

impl Holding {
    pub fn asset(&self) -> Option<HoldingAsset<'_>> {
        match (&self.token, &self.currency) {
            (Some(token), None) => token.get().map(HoldingAsset::Token),
            (None, Some(currency)) => currency.get().map(HoldingAsset::Currency),
            _ => None,
        }
    }
}

impl Resource for Holding {
    const KIND: ResourceKind = ResourceKind::Holding;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        match (&self.token, &self.currency) {
            (None, None) => return Err(ctx.invalid("holding must have either erc20 token or currency")),
            (Some(_), Some(_)) => {
                return Err(ctx.invalid("holding cannot have both erc20 token and currency"))
            }
            _ => {}
        }

        ctx.resolve("account", &mut self.account)?;
        if let Some(token) = self.token.as_mut() {
            ctx.resolve("token", token)?;
        }
        if let Some(currency) = self.currency.as_mut() {
            ctx.resolve("currency", currency)?;
        }
        Ok(())
    }
}

// ========== Scripts ==========

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptInput {
    #[serde(alias = "k")]
    pub key: String,
    #[serde(alias = "v")]
    pub value: String,
}

/// A chain an invocation needs an RPC for, exposed to it under `key`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcDependency {
    #[serde(alias = "k")]
    pub key: String,
    pub chain: ResourceRef<Chain>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<ScriptInput>,
    pub invocation: String,
    #[serde(default)]
    pub rpcs: Vec<RpcDependency>,
}

impl Script {
    pub fn rpc_chain(&self, key: &str) -> Option<&Arc<Chain>> {
        self.rpcs.iter().find(|d| d.key == key)?.chain.get()
    }
}

impl Resource for Script {
    const KIND: ResourceKind = ResourceKind::Script;

    fn init(&mut self, ctx: &LoadContext<'_>) -> Result<(), ResourceError> {
        for dep in self.rpcs.iter_mut() {
            ctx.resolve(&format!("rpcs[{}]", dep.key), &mut dep.chain)?;
        }
        Ok(())
    }
}
