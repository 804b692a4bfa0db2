//! Access requests and authorization decisions

use chrono::{DateTime, Utc};
use rowguard_core::{EntityKind, Operation, PrincipalId, RowImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A (principal, operation, row) triple to authorize.
///
/// `existing` is the stored row image (SELECT, UPDATE, DELETE); `proposed`
/// is the post-write image the with-check runs against (INSERT, UPDATE).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Principal performing the operation
    pub principal: PrincipalId,

    /// Governed entity being touched
    pub entity: EntityKind,

    /// Operation being attempted
    pub operation: Operation,

    /// Current row image, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<RowImage>,

    /// Proposed post-write row image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed: Option<RowImage>,
}

impl AccessRequest {
    /// Read an existing row
    pub fn select(principal: PrincipalId, row: RowImage) -> Self {
        Self {
            principal,
            entity: row.entity,
            operation: Operation::Select,
            existing: Some(row),
            proposed: None,
        }
    }

    /// Insert a new row; the check runs against the proposed image
    pub fn insert(principal: PrincipalId, proposed: RowImage) -> Self {
        Self {
            principal,
            entity: proposed.entity,
            operation: Operation::Insert,
            existing: None,
            proposed: Some(proposed),
        }
    }

    /// Mutate an existing row; the check runs against both images
    pub fn update(principal: PrincipalId, existing: RowImage, proposed: RowImage) -> Self {
        Self {
            principal,
            entity: existing.entity,
            operation: Operation::Update,
            existing: Some(existing),
            proposed: Some(proposed),
        }
    }

    /// Delete an existing row
    pub fn delete(principal: PrincipalId, existing: RowImage) -> Self {
        Self {
            principal,
            entity: existing.entity,
            operation: Operation::Delete,
            existing: Some(existing),
            proposed: None,
        }
    }
}

/// Authorization decision with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Unique decision id
    pub id: String,

    /// Whether the operation is allowed
    pub allowed: bool,

    /// Entity the decision covers
    pub entity: EntityKind,

    /// Operation the decision covers
    pub operation: Operation,

    /// Why the decision came out this way
    pub reason: DecisionReason,

    /// Decision time
    pub timestamp: DateTime<Utc>,
}

impl AccessDecision {
    fn new(allowed: bool, entity: EntityKind, operation: Operation, reason: DecisionReason) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            allowed,
            entity,
            operation,
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Allow decision
    pub fn allow(entity: EntityKind, operation: Operation, reason: DecisionReason) -> Self {
        Self::new(true, entity, operation, reason)
    }

    /// Deny decision
    pub fn deny(entity: EntityKind, operation: Operation, reason: DecisionReason) -> Self {
        Self::new(false, entity, operation, reason)
    }
}

/// Reason for an authorization decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionReason {
    /// A registered predicate composition granted or refused the operation
    Predicate { detail: String },

    /// Principal holds no profile row in either variant: no scope, deny
    NoProfile,

    /// Row data could not be evaluated; denied fail-closed
    EvaluationFault { detail: String },
}
