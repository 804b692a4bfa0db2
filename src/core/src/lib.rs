//! # Rowguard Core
//!
//! Shared data-model types for the Rowguard row-level authorization engine.
//! This package holds the entity taxonomy and row representations so the
//! policy engine and storage adapters do not depend on each other directly.

pub mod entity;
pub mod row;

// Re-export commonly used types
pub use entity::{EntityKind, Operation, ProfileVariant};
pub use row::{ProfileRow, RowImage};

use uuid::Uuid;

/// Identifier of an authenticated caller. Profile rows use the principal id
/// as their primary key.
pub type PrincipalId = Uuid;

/// Tenant (organization) identifier
pub type OrgId = Uuid;

/// Row identifier within any governed table
pub type RowId = Uuid;
