// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wallet_router::config::{LogFormat, RouterConfig, DEFAULT_LOG_FILTER};
use wallet_router::provider::{ProviderInfo, ProviderSettings, DEFAULT_RDNS};
use wallet_router::resources::{FsStore, ProviderRpc, ResourceId, ResourceKind, ResourceManager};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    if let Err(e) = installed {
        eprintln!("Failed to install tracing subscriber: {e}");
    }
}

fn main() -> ExitCode {
    let config = match RouterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    info!(
        root = %config.config_root.display(),
        provider = %config.provider_id,
        "Loading provider configuration"
    );
    let manager = ResourceManager::new(FsStore::new(&config.config_root));
    let id = ResourceId::<ProviderRpc>::new(config.provider_id.as_str());

    let provider = match manager.resolve(&id, "/") {
        Ok(provider) => provider,
        Err(e) => {
            let path = e.reference_path().join(" -> ");
            error!(error = %e.root_cause(), path = %path, "Failed to load provider");
            eprintln!("Failed to load {}: {e}", config.provider_id);
            if !path.is_empty() {
                eprintln!("  via {path}");
            }
            return ExitCode::FAILURE;
        }
    };

    for kind in ResourceKind::ALL {
        let count = manager.len(kind);
        if count > 0 {
            info!(kind = %kind, count, "Resources loaded");
        }
    }

    let Some(settings) = ProviderSettings::from_provider(&provider) else {
        error!(provider = %config.provider_id, "Provider backend reaches no chain");
        return ExitCode::FAILURE;
    };
    let settings = settings
        .with_client_version(config.client_version)
        .with_timeouts(config.forward_timeout, config.response_timeout);
    info!(
        session = %provider.session_id,
        chain_id = settings.chain_id,
        known_chains = ?settings.known_chains,
        accounts = settings.accounts.len(),
        client_version = %settings.client_version,
        "Provider ready"
    );

    let announcement = ProviderInfo::from_provider(&provider, DEFAULT_RDNS);
    match serde_json::to_string_pretty(&announcement) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Failed to encode provider info");
            ExitCode::FAILURE
        }
    }
}
