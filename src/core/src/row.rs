//! Row representations used by policy evaluation
//!
//! Policy predicates only ever read the scope columns (`id`,
//! `organization_id`, `user_id`); everything else a row carries travels in
//! an attribute map and is opaque to the engine.

use crate::entity::EntityKind;
use crate::{OrgId, PrincipalId, RowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A profile row. The primary key is the principal id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    /// Principal id (primary key)
    pub id: PrincipalId,

    /// Tenant reference; `None` on the secondary profile table
    pub organization_id: Option<OrgId>,

    /// Last mutation time, maintained by the timestamp trigger
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    pub fn new(id: PrincipalId, organization_id: Option<OrgId>) -> Self {
        Self {
            id,
            organization_id,
            updated_at: Utc::now(),
        }
    }
}

/// The image of a row as seen by a policy check.
///
/// For SELECT and DELETE this is the stored row; for INSERT it is the
/// proposed row that would be committed; for UPDATE both images are
/// checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowImage {
    /// Governed entity this row belongs to
    pub entity: EntityKind,

    /// Row primary key
    pub id: RowId,

    /// Tenant scope column; absent on entities without an org dimension
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrgId>,

    /// Owner scope column; absent on entities without an owner dimension
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<PrincipalId>,

    /// Non-policy columns (title, payload, `updated_at`, ...)
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl RowImage {
    /// Create a row image with empty attributes
    pub fn new(entity: EntityKind, id: RowId) -> Self {
        Self {
            entity,
            id,
            organization_id: None,
            user_id: None,
            attributes: HashMap::new(),
        }
    }

    /// Set the tenant scope column
    pub fn with_organization(mut self, org: OrgId) -> Self {
        self.organization_id = Some(org);
        self
    }

    /// Set the owner scope column
    pub fn with_owner(mut self, owner: PrincipalId) -> Self {
        self.user_id = Some(owner);
        self
    }

    /// Attach a non-policy attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}
