// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The resource manager: a load-once cache over the resource store.
//!
//! ## Resolution
//!
//! 1. The identifier is made absolute against the referencing unit's
//!    directory and cleaned. This canonical form is the cache key.
//! 2. A cache hit returns the shared instance.
//! 3. Otherwise the unit is read from the store, decoded strictly and its
//!    `init` hook resolves every reference field. Only a fully initialized
//!    object is inserted into the cache.
//!
//! ## Concurrency
//!
//! Each kind has its own `RwLock`ed map. Concurrent resolution of the same
//! identifier is coalesced: the first caller registers an in-flight cell and
//! performs the load, later callers block on that cell and receive the same
//! result (object or error).
//!
//! Re-entrant resolution of an identifier already on the current load path
//! fails with [`ResourceError::Cycle`]. Two threads loading the two halves of
//! a cycle at the same moment will wait on each other; configuration graphs
//! are expected to be acyclic.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use super::id::{join_path, parent_dir};
use super::{Resource, ResourceError, ResourceId, ResourceKind, ResourceRef, ResourceStore};

type Shared = Arc<dyn Any + Send + Sync>;
type LoadResult = Result<Shared, ResourceError>;
type KindMap = RwLock<HashMap<String, Shared>>;

/// Process-wide cache of resolved resources, one map per kind.
pub struct ResourceManager {
    store: Arc<dyn ResourceStore>,
    maps: [KindMap; ResourceKind::COUNT],
    in_flight: Mutex<HashMap<(ResourceKind, String), Arc<OnceLock<LoadResult>>>>,
}

impl ResourceManager {
    pub fn new(store: impl ResourceStore + 'static) -> Self {
        Self::with_store(Arc::new(store))
    }

    pub fn with_store(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            maps: std::array::from_fn(|_| RwLock::default()),
            in_flight: Mutex::default(),
        }
    }

    /// Resolve `id` (relative to `base` unless absolute) into a loaded resource.
    pub fn resolve<R: Resource>(
        &self,
        id: &ResourceId<R>,
        base: &str,
    ) -> Result<Arc<R>, ResourceError> {
        let canonical = join_path(base, id.as_str());
        self.resolve_in::<R>(&canonical, &[]).inspect_err(|e| {
            tracing::warn!(
                kind = %R::KIND,
                id = %canonical,
                error = %e,
                path = ?e.reference_path(),
                "Resource resolution failed"
            );
        })
    }

    /// Look up an already loaded resource by absolute identifier.
    pub fn get<R: Resource>(&self, id: &ResourceId<R>) -> Option<Arc<R>> {
        let canonical = join_path("/", id.as_str());
        self.cached::<R>(&canonical).ok().flatten()
    }

    /// Number of loaded resources of `kind`.
    pub fn len(&self, kind: ResourceKind) -> usize {
        self.maps[kind.index()]
            .read()
            .map(|map| map.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        ResourceKind::ALL.iter().all(|kind| self.len(*kind) == 0)
    }

    /// Sorted identifiers of loaded resources of `kind`.
    pub fn ids(&self, kind: ResourceKind) -> Vec<String> {
        let mut ids: Vec<String> = self.maps[kind.index()]
            .read()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    fn cached<R: Resource>(&self, id: &str) -> Result<Option<Arc<R>>, ResourceError> {
        let map = self.maps[R::KIND.index()]
            .read()
            .map_err(|_| ResourceError::Poisoned)?;
        match map.get(id) {
            Some(shared) => shared
                .clone()
                .downcast::<R>()
                .map(Some)
                .map_err(|_| ResourceError::KindMismatch {
                    kind: R::KIND,
                    id: id.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn resolve_in<R: Resource>(
        &self,
        id: &str,
        path: &[(ResourceKind, String)],
    ) -> Result<Arc<R>, ResourceError> {
        if let Some(hit) = self.cached::<R>(id)? {
            tracing::debug!(kind = %R::KIND, id, "Resource cache hit");
            return Ok(hit);
        }

        if path.iter().any(|(kind, p)| *kind == R::KIND && p == id) {
            let mut cycle: Vec<String> = path.iter().map(|(_, p)| p.clone()).collect();
            cycle.push(id.to_string());
            return Err(ResourceError::Cycle { path: cycle });
        }

        let key = (R::KIND, id.to_string());
        let cell = {
            let mut in_flight = self.in_flight.lock().map_err(|_| ResourceError::Poisoned)?;
            in_flight.entry(key.clone()).or_default().clone()
        };

        let result = cell.get_or_init(|| self.load::<R>(id, path)).clone();

        if let Ok(mut in_flight) = self.in_flight.lock() {
            if in_flight.get(&key).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
                in_flight.remove(&key);
            }
        }

        result?
            .downcast::<R>()
            .map_err(|_| ResourceError::KindMismatch {
                kind: R::KIND,
                id: id.to_string(),
            })
    }

    fn load<R: Resource>(&self, id: &str, path: &[(ResourceKind, String)]) -> LoadResult {
        // Another caller may have finished between the cache check and
        // registering the in-flight cell.
        if let Some(hit) = self.cached::<R>(id)? {
            return Ok(hit);
        }

        let raw = self.store.open(id).map_err(|e| ResourceError::Open {
            kind: R::KIND,
            id: id.to_string(),
            source: Arc::new(e),
        })?;

        let mut resource: R = serde_yaml::from_slice(&raw).map_err(|e| ResourceError::Decode {
            kind: R::KIND,
            id: id.to_string(),
            source: Arc::new(e),
        })?;

        let mut stack = path.to_vec();
        stack.push((R::KIND, id.to_string()));
        let ctx = LoadContext {
            manager: self,
            kind: R::KIND,
            id,
            base: parent_dir(id),
            path: &stack,
        };
        resource.init(&ctx)?;

        let shared = Arc::new(resource);
        self.maps[R::KIND.index()]
            .write()
            .map_err(|_| ResourceError::Poisoned)?
            .insert(id.to_string(), shared.clone());

        tracing::debug!(kind = %R::KIND, id, depth = path.len(), "Loaded resource");
        Ok(shared)
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("ResourceManager");
        for kind in ResourceKind::ALL {
            dbg.field(kind.as_str(), &self.len(kind));
        }
        dbg.finish()
    }
}

/// Handed to [`Resource::init`] while a unit is being loaded.
pub struct LoadContext<'a> {
    manager: &'a ResourceManager,
    kind: ResourceKind,
    id: &'a str,
    base: String,
    path: &'a [(ResourceKind, String)],
}

impl LoadContext<'_> {
    /// Canonical identifier of the unit being initialized.
    pub fn id(&self) -> &str {
        self.id
    }

    /// Directory against which relative references resolve.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn manager(&self) -> &ResourceManager {
        self.manager
    }

    /// Resolve a reference field, canonicalizing its identifier in place.
    ///
    /// `field` names the field in errors, e.g. `chain` or `accounts[2]`.
    pub fn resolve<T: Resource>(
        &self,
        field: &str,
        reference: &mut ResourceRef<T>,
    ) -> Result<(), ResourceError> {
        if reference.id().is_empty() {
            return Err(self.invalid(format!("{field} references an empty identifier")));
        }

        let canonical: ResourceId<T> = reference.id().absolutize(&self.base);
        let target = self
            .manager
            .resolve_in::<T>(canonical.as_str(), self.path)
            .map_err(|e| ResourceError::Reference {
                kind: self.kind,
                id: self.id.to_string(),
                field: field.to_string(),
                source: Box::new(e),
            })?;

        reference.bind(canonical, target);
        Ok(())
    }

    /// Structural invariant failure of the unit being initialized.
    pub fn invalid(&self, reason: impl Into<String>) -> ResourceError {
        ResourceError::Invalid {
            kind: self.kind,
            id: self.id.to_string(),
            reason: reason.into(),
        }
    }
}
