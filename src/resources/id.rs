// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed resource identifiers and reference fields.
//!
//! An identifier is a slash-separated path into the resource store. Relative
//! identifiers are resolved against the directory of the unit that contains
//! them; the resulting absolute, lexically cleaned path is the canonical form
//! used as cache key.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lexically normalize a slash-separated path.
///
/// Removes `.` segments, duplicate slashes and resolves `..` against the
/// preceding segment. A rooted path never climbs above `/`.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Directory part of a cleaned path (`/a/b.yaml` -> `/a`).
pub fn parent_dir(path: &str) -> String {
    let cleaned = clean_path(path);
    match cleaned.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => cleaned[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// Join `rel` onto `base` unless `rel` is already absolute, then clean.
///
/// The result is always rooted: a relative `base` is taken from the store
/// root, so `("eth.yaml", ".")` and `("/eth.yaml", "/")` name the same unit.
pub fn join_path(base: &str, rel: &str) -> String {
    if rel.starts_with('/') {
        clean_path(rel)
    } else {
        clean_path(&format!("/{base}/{rel}"))
    }
}

/// Identifier of a resource of type `R`.
pub struct ResourceId<R> {
    raw: String,
    _kind: PhantomData<fn() -> R>,
}

impl<R> ResourceId<R> {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            _kind: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_absolute(&self) -> bool {
        self.raw.starts_with('/')
    }

    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Canonical form of this identifier relative to `base`.
    pub fn absolutize(&self, base: &str) -> ResourceId<R> {
        ResourceId::new(join_path(base, &self.raw))
    }
}

impl<R> Clone for ResourceId<R> {
    fn clone(&self) -> Self {
        Self::new(self.raw.clone())
    }
}

impl<R> PartialEq for ResourceId<R> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<R> Eq for ResourceId<R> {}

impl<R> Hash for ResourceId<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<R> fmt::Debug for ResourceId<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({:?})", self.raw)
    }
}

impl<R> fmt::Display for ResourceId<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<R> From<&str> for ResourceId<R> {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl<R> Serialize for ResourceId<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de, R> Deserialize<'de> for ResourceId<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// A reference field inside a resource.
///
/// Deserializes from an identifier string. Once the owning resource has been
/// initialized the identifier is canonical and the target is attached.
pub struct ResourceRef<R> {
    id: ResourceId<R>,
    resolved: Option<Arc<R>>,
}

impl<R> ResourceRef<R> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(id),
            resolved: None,
        }
    }

    pub fn id(&self) -> &ResourceId<R> {
        &self.id
    }

    /// The referenced resource, once resolved.
    pub fn get(&self) -> Option<&Arc<R>> {
        self.resolved.as_ref()
    }

    pub(crate) fn bind(&mut self, id: ResourceId<R>, target: Arc<R>) {
        self.id = id;
        self.resolved = Some(target);
    }
}

impl<R> Clone for ResourceRef<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            resolved: self.resolved.clone(),
        }
    }
}

impl<R> fmt::Debug for ResourceRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRef")
            .field("id", &self.id.raw)
            .field("resolved", &self.resolved.is_some())
            .finish()
    }
}

impl<R> Serialize for ResourceRef<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id.serialize(serializer)
    }
}

impl<'de, R> Deserialize<'de> for ResourceRef<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}
