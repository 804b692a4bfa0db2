//! # Rowguard Authorization Engine
//!
//! Row-level, multi-tenant authorization: for every data-access request the
//! engine decides, per row, whether the acting principal may read, insert,
//! update, or delete it, based on organization membership and record
//! ownership.
//!
//! ## Features
//!
//! - **Principal resolution** against two independent profile tables
//! - **Indexed membership lookups** (equality-only, no scans)
//! - **Static entity registry**: a closed entity set with per-operation
//!   predicate compositions, no runtime rule injection
//! - **With-check mutations**: INSERT/UPDATE validated against the
//!   proposed post-write image, atomically with the commit
//! - **Pinned privileged routines**: the timestamp trigger resolves
//!   against a build-time binding table, never caller session state
//!
//! ## Example
//!
//! ```rust
//! use rowguard_authz::engine::PolicyEngine;
//! use rowguard_authz::store::InMemoryStore;
//! use rowguard_core::{EntityKind, ProfileRow, ProfileVariant, RowImage};
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryStore::new());
//!     let engine = PolicyEngine::new(store.clone());
//!
//!     let alice = Uuid::new_v4();
//!     let org = Uuid::new_v4();
//!     store
//!         .seed_profile(ProfileVariant::Primary, ProfileRow::new(alice, Some(org)))
//!         .await;
//!
//!     let doc = RowImage::new(EntityKind::Document, Uuid::new_v4())
//!         .with_organization(org)
//!         .with_owner(alice);
//!
//!     let decision = engine.can_select(alice, &doc).await?;
//!     assert!(decision.allowed);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod index;
pub mod membership;
pub mod predicate;
pub mod registry;
pub mod resolver;
pub mod sandbox;
pub mod store;

// Re-export commonly used types
pub use engine::{AccessDecision, AccessRequest, DecisionReason, EngineConfig, PolicyEngine};
pub use error::{AuthzError, Result};
pub use membership::MembershipIndex;
pub use predicate::{Combinator, Predicate};
pub use registry::{policy_for, predicates_for, PolicySpec};
pub use resolver::{PrincipalResolver, ProfileSource, ResolvedPrincipal};
pub use sandbox::{FunctionSandbox, SessionContext};
pub use store::{InMemoryStore, SystemKv};
