//! Endpoint catalog
//!
//! The static table of destinations aliases may forward to. It is built once
//! from configuration and never changes for the life of the process, so an
//! [`EndpointId`] (the endpoint's position) stays valid throughout.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Position of an endpoint in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(usize);

impl EndpointId {
    /// Create an id from a catalog position
    ///
    /// The id is not checked here; [`EndpointCatalog::get`] returns `None`
    /// for positions past the end.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The catalog position
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A forwarding destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Canonical destination email
    pub email: String,

    /// Display name
    #[serde(default)]
    pub nickname: String,

    /// Names this endpoint was known by in other tools (used by imports)
    #[serde(default, alias = "old")]
    pub legacy_names: BTreeSet<String>,
}

impl Endpoint {
    /// Create an endpoint with no legacy names
    pub fn new(email: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            nickname: nickname.into(),
            legacy_names: BTreeSet::new(),
        }
    }

    /// Add a legacy name
    pub fn with_legacy_name(mut self, name: impl Into<String>) -> Self {
        self.legacy_names.insert(name.into());
        self
    }

    /// Whether a foreign label designates this endpoint
    fn answers_to(&self, label: &str) -> bool {
        self.legacy_names.contains(label) || self.email == label || self.nickname == label
    }
}

/// Static lookup table of endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointCatalog {
    endpoints: Vec<Endpoint>,
}

impl EndpointCatalog {
    /// Create a catalog; order defines the endpoint ids
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    /// Number of endpoints
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Look up an endpoint by id
    pub fn get(&self, id: EndpointId) -> Option<&Endpoint> {
        self.endpoints.get(id.index())
    }

    /// Iterate endpoints with their ids
    pub fn iter(&self) -> impl Iterator<Item = (EndpointId, &Endpoint)> {
        self.endpoints
            .iter()
            .enumerate()
            .map(|(index, endpoint)| (EndpointId(index), endpoint))
    }

    /// Find the endpoint with exactly this email
    pub fn by_email(&self, email: &str) -> Option<EndpointId> {
        self.iter()
            .find(|(_, endpoint)| endpoint.email == email)
            .map(|(id, _)| id)
    }

    /// Resolve a label from an export document
    ///
    /// Endpoints are tried in catalog order; the first one whose legacy
    /// names contain the label, whose email equals it, or whose nickname
    /// equals it wins.
    pub fn resolve_label(&self, label: &str) -> Option<EndpointId> {
        self.iter()
            .find(|(_, endpoint)| endpoint.answers_to(label))
            .map(|(id, _)| id)
    }

    /// Resolve a user-supplied reference: a catalog position or any label
    pub fn lookup(&self, reference: &str) -> Option<EndpointId> {
        let reference = reference.trim();
        if let Ok(index) = reference.parse::<usize>() {
            return (index < self.len()).then_some(EndpointId(index));
        }
        self.resolve_label(reference)
    }
}
