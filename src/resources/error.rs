// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource loading errors.

use std::io;
use std::sync::Arc;

use super::ResourceKind;

/// Failure to load a resource or one of its references.
///
/// Cloneable so that one failed load can be handed to every caller waiting on
/// the same identifier.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResourceError {
    #[error("failed to open {kind} resource {id:?}")]
    Open {
        kind: ResourceKind,
        id: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("failed to decode {kind} resource {id:?}")]
    Decode {
        kind: ResourceKind,
        id: String,
        #[source]
        source: Arc<serde_yaml::Error>,
    },

    #[error("invalid {kind} resource {id:?}: {reason}")]
    Invalid {
        kind: ResourceKind,
        id: String,
        reason: String,
    },

    #[error("failed to load {field} of {kind} resource {id:?}")]
    Reference {
        kind: ResourceKind,
        id: String,
        field: String,
        #[source]
        source: Box<ResourceError>,
    },

    #[error("cyclic reference: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("resource {id:?} is cached with a different type than {kind}")]
    KindMismatch { kind: ResourceKind, id: String },

    #[error("resource cache lock poisoned")]
    Poisoned,
}

impl ResourceError {
    /// The `identifier#field` hops leading to the innermost failure.
    pub fn reference_path(&self) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = self;
        while let ResourceError::Reference {
            id, field, source, ..
        } = current
        {
            path.push(format!("{id}#{field}"));
            current = source;
        }
        path
    }

    /// The innermost error of a reference chain.
    pub fn root_cause(&self) -> &ResourceError {
        let mut current = self;
        while let ResourceError::Reference { source, .. } = current {
            current = source;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> ResourceError {
        ResourceError::Reference {
            kind: ResourceKind::Holding,
            id: "/holdings/h.yaml".to_string(),
            field: "account".to_string(),
            source: Box::new(ResourceError::Reference {
                kind: ResourceKind::Wallet,
                id: "/accounts/a.yaml".to_string(),
                field: "accounts[1]".to_string(),
                source: Box::new(ResourceError::Open {
                    kind: ResourceKind::Account,
                    id: "/accounts/missing.yaml".to_string(),
                    source: Arc::new(io::Error::new(io::ErrorKind::NotFound, "gone")),
                }),
            }),
        }
    }

    #[test]
    fn reference_path_walks_the_chain() {
        assert_eq!(
            nested().reference_path(),
            vec![
                "/holdings/h.yaml#account".to_string(),
                "/accounts/a.yaml#accounts[1]".to_string(),
            ]
        );
    }

    #[test]
    fn root_cause_is_innermost() {
        let err = nested();
        assert!(matches!(err.root_cause(), ResourceError::Open { id, .. } if id == "/accounts/missing.yaml"));
        assert_eq!(
            err.to_string(),
            "failed to load account of holding resource \"/holdings/h.yaml\""
        );
    }

    #[test]
    fn cycle_lists_path() {
        let err = ResourceError::Cycle {
            path: vec!["/a.yaml".into(), "/b.yaml".into(), "/a.yaml".into()],
        };
        assert_eq!(err.to_string(), "cyclic reference: /a.yaml -> /b.yaml -> /a.yaml");
    }
}
