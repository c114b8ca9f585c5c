// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors surfaced to JSON-RPC peers.
//!
//! Codes follow EIP-1193 (provider errors), EIP-1474 and the base JSON-RPC
//! 2.0 specification.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Well-known error codes used by the provider router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The user rejected the request.
    UserRejectedRequest,
    /// The requested method and/or account has not been authorized.
    Unauthorized,
    /// The provider does not support the requested method.
    UnsupportedMethod,
    /// The provider is disconnected from all chains.
    Disconnected,
    /// The provider is not connected to the requested chain.
    ChainDisconnected,
    /// The chain has not been added to the wallet.
    UnrecognizedChain,
    /// The backend is unavailable or did not answer in time.
    ResourceUnavailable,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    Internal,
}

impl ErrorCode {
    pub fn code(self) -> i64 {
        match self {
            ErrorCode::UserRejectedRequest => 4001,
            ErrorCode::Unauthorized => 4100,
            ErrorCode::UnsupportedMethod => 4200,
            ErrorCode::Disconnected => 4900,
            ErrorCode::ChainDisconnected => 4901,
            ErrorCode::UnrecognizedChain => 4902,
            ErrorCode::ResourceUnavailable => -32002,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::Internal => -32603,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::UserRejectedRequest => "User rejected the request",
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::UnsupportedMethod => "Method not supported",
            ErrorCode::Disconnected => "Disconnected",
            ErrorCode::ChainDisconnected => "Chain disconnected",
            ErrorCode::UnrecognizedChain => "Unrecognized chain",
            ErrorCode::ResourceUnavailable => "Resource unavailable",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::Internal => "Internal error",
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
            data: None,
        }
    }

    /// Error with the nested cause attached as `data.cause`.
    pub fn annotated(code: ErrorCode, cause: impl fmt::Display) -> Self {
        Self {
            data: Some(json!({ "cause": cause.to_string() })),
            ..Self::new(code)
        }
    }

    pub fn unauthorized(cause: impl fmt::Display) -> Self {
        Self::annotated(ErrorCode::Unauthorized, cause)
    }

    pub fn unsupported_method(cause: impl fmt::Display) -> Self {
        Self::annotated(ErrorCode::UnsupportedMethod, cause)
    }

    pub fn user_rejected(cause: impl fmt::Display) -> Self {
        Self::annotated(ErrorCode::UserRejectedRequest, cause)
    }

    pub fn invalid_request(cause: impl fmt::Display) -> Self {
        Self::annotated(ErrorCode::InvalidRequest, cause)
    }

    pub fn invalid_params(cause: impl fmt::Display) -> Self {
        Self::annotated(ErrorCode::InvalidParams, cause)
    }

    pub fn resource_unavailable(cause: impl fmt::Display) -> Self {
        Self::annotated(ErrorCode::ResourceUnavailable, cause)
    }

    pub fn internal(cause: impl fmt::Display) -> Self {
        Self::annotated(ErrorCode::Internal, cause)
    }

    /// Whether this error carries the given well-known code.
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code.code()
    }

    /// The annotated cause, if any.
    pub fn cause(&self) -> Option<&str> {
        self.data.as_ref()?.get("cause")?.as_str()
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cause() {
            Some(cause) => write!(f, "{} ({}): {cause}", self.message, self.code),
            None => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

impl std::error::Error for RpcError {}
