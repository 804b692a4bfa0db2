//! In-memory guarded store
//!
//! A stand-in for the storage engine collaborator. It demonstrates the
//! contract the real engine's access-check hook must satisfy: every
//! mutation evaluates its with-check against the row image that will be
//! committed, inside the same critical section as the commit (one write
//! lock spans check and write, so there is no check-then-act window).
//!
//! The store also hosts the system key-value table, which is excluded from
//! policy enforcement: it is reachable only through [`InMemoryStore::system_kv`]
//! on the backend API and has no governed-entity kind, so no principal-facing
//! path can address it.

use crate::engine::{self, AccessDecision, AccessRequest, DecisionReason};
use crate::error::{AuthzError, Result};
use crate::membership::MembershipIndex;
use crate::resolver::ProfileSource;
use crate::sandbox::{FunctionSandbox, SessionContext, TOUCH_UPDATED_AT, UPDATED_AT_ATTR};
use async_trait::async_trait;
use dashmap::DashMap;
use rowguard_core::{EntityKind, PrincipalId, ProfileRow, ProfileVariant, RowId, RowImage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Backend-internal key-value table.
///
/// Open to the executing backend, never to principals: no policy check is
/// invoked here because the table is not part of the governed entity set.
#[derive(Default)]
pub struct SystemKv {
    entries: DashMap<String, serde_json::Value>,
}

impl SystemKv {
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.get(key).map(|v| v.clone())
    }

    pub fn put(&self, key: impl Into<String>, value: serde_json::Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
struct Tables {
    profiles: HashMap<PrincipalId, ProfileRow>,
    user_profiles: HashMap<PrincipalId, ProfileRow>,
    /// All other governed entities, keyed by row id
    rows: HashMap<EntityKind, HashMap<RowId, RowImage>>,
}

impl Tables {
    fn membership_for(&self, principal: PrincipalId) -> MembershipIndex {
        MembershipIndex::from_rows(
            principal,
            self.profiles.get(&principal),
            self.user_profiles.get(&principal),
        )
    }

    fn profile_image(variant: ProfileVariant, row: &ProfileRow) -> RowImage {
        let mut image = RowImage::new(variant.entity(), row.id);
        image.organization_id = row.organization_id;
        image.attributes.insert(
            UPDATED_AT_ATTR.to_string(),
            serde_json::Value::String(row.updated_at.to_rfc3339()),
        );
        image
    }

    fn row_images(&self, entity: EntityKind) -> Vec<RowImage> {
        match entity {
            EntityKind::Profile => self
                .profiles
                .values()
                .map(|p| Self::profile_image(ProfileVariant::Primary, p))
                .collect(),
            EntityKind::UserProfile => self
                .user_profiles
                .values()
                .map(|p| Self::profile_image(ProfileVariant::Secondary, p))
                .collect(),
            _ => self
                .rows
                .get(&entity)
                .map(|table| table.values().cloned().collect())
                .unwrap_or_default(),
        }
    }

    fn find(&self, entity: EntityKind, id: RowId) -> Option<RowImage> {
        match entity {
            EntityKind::Profile => self
                .profiles
                .get(&id)
                .map(|p| Self::profile_image(ProfileVariant::Primary, p)),
            EntityKind::UserProfile => self
                .user_profiles
                .get(&id)
                .map(|p| Self::profile_image(ProfileVariant::Secondary, p)),
            _ => self.rows.get(&entity).and_then(|t| t.get(&id)).cloned(),
        }
    }

    fn commit(&mut self, image: RowImage) {
        match image.entity {
            EntityKind::Profile => {
                self.profiles
                    .insert(image.id, ProfileRow::new(image.id, image.organization_id));
            }
            EntityKind::UserProfile => {
                self.user_profiles
                    .insert(image.id, ProfileRow::new(image.id, None));
            }
            entity => {
                self.rows.entry(entity).or_default().insert(image.id, image);
            }
        }
    }

    fn remove(&mut self, entity: EntityKind, id: RowId) {
        match entity {
            EntityKind::Profile => {
                self.profiles.remove(&id);
            }
            EntityKind::UserProfile => {
                self.user_profiles.remove(&id);
            }
            _ => {
                if let Some(table) = self.rows.get_mut(&entity) {
                    table.remove(&id);
                }
            }
        }
    }
}

/// In-memory storage engine with the access-check hook wired in
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    kv: SystemKv,
    sandbox: Arc<FunctionSandbox>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_sandbox(Arc::new(FunctionSandbox::with_defaults()))
    }

    pub fn with_sandbox(sandbox: Arc<FunctionSandbox>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            kv: SystemKv::default(),
            sandbox,
        }
    }

    /// Backend-internal key-value table (no policy surface)
    pub fn system_kv(&self) -> &SystemKv {
        &self.kv
    }

    // ---- backend/migration paths (no policy; not principal-facing) ----

    /// Seed a profile row directly. Migration-tool path.
    pub async fn seed_profile(&self, variant: ProfileVariant, row: ProfileRow) {
        let mut tables = self.tables.write().await;
        match variant {
            ProfileVariant::Primary => tables.profiles.insert(row.id, row),
            ProfileVariant::Secondary => tables.user_profiles.insert(row.id, row),
        };
    }

    /// Seed any governed row directly. Migration-tool path.
    pub async fn seed_row(&self, image: RowImage) {
        let mut tables = self.tables.write().await;
        tables.commit(image);
    }

    // ---- principal-facing guarded operations ----

    /// Rows of `entity` visible to `principal`. Non-visible rows are
    /// absent, not redacted; a principal with no profile sees nothing.
    pub async fn select_rows(
        &self,
        principal: PrincipalId,
        entity: EntityKind,
    ) -> Result<Vec<RowImage>> {
        let tables = self.tables.read().await;
        let membership = tables.membership_for(principal);

        let mut visible = Vec::new();
        for row in tables.row_images(entity) {
            let request = AccessRequest::select(principal, row.clone());
            if engine::evaluate(&membership, &request)?.allowed {
                visible.push(row);
            }
        }
        Ok(visible)
    }

    /// A single row, if it exists and is visible to `principal`
    pub async fn get_row(
        &self,
        principal: PrincipalId,
        entity: EntityKind,
        id: RowId,
    ) -> Result<Option<RowImage>> {
        let tables = self.tables.read().await;
        let Some(row) = tables.find(entity, id) else {
            return Ok(None);
        };

        let membership = tables.membership_for(principal);
        let request = AccessRequest::select(principal, row.clone());
        if engine::evaluate(&membership, &request)?.allowed {
            Ok(Some(row))
        } else {
            Ok(None)
        }
    }

    /// Insert with with-check semantics: the predicate is evaluated against
    /// the proposed image inside the commit's critical section.
    pub async fn insert(&self, principal: PrincipalId, proposed: RowImage) -> Result<RowImage> {
        let mut tables = self.tables.write().await;

        if tables.find(proposed.entity, proposed.id).is_some() {
            return Err(AuthzError::Storage(format!(
                "duplicate key in {}: {}",
                proposed.entity, proposed.id
            )));
        }

        let membership = tables.membership_for(principal);
        let request = AccessRequest::insert(principal, proposed.clone());
        ensure_allowed(engine::evaluate(&membership, &request)?)?;

        tables.commit(proposed.clone());
        debug!(entity = %proposed.entity, id = %proposed.id, "row inserted");
        Ok(proposed)
    }

    /// Update with with-check semantics: the single authoritative predicate
    /// must hold on the stored image and on the proposed image, and the
    /// timestamp trigger runs through the sandbox before commit. The
    /// caller's session bindings are carried but never resolved.
    pub async fn update(
        &self,
        principal: PrincipalId,
        mut proposed: RowImage,
        session: &SessionContext,
    ) -> Result<RowImage> {
        let mut tables = self.tables.write().await;

        let existing = tables
            .find(proposed.entity, proposed.id)
            .ok_or(AuthzError::RowMissing {
                entity: proposed.entity,
                id: proposed.id,
            })?;

        let membership = tables.membership_for(principal);
        let request = AccessRequest::update(principal, existing, proposed.clone());
        ensure_allowed(engine::evaluate(&membership, &request)?)?;

        self.sandbox
            .run_privileged(TOUCH_UPDATED_AT, session, &mut proposed)?;

        tables.commit(proposed.clone());
        debug!(entity = %proposed.entity, id = %proposed.id, "row updated");
        Ok(proposed)
    }

    /// Delete: the predicate is evaluated against the stored image
    pub async fn delete(
        &self,
        principal: PrincipalId,
        entity: EntityKind,
        id: RowId,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;

        let existing = tables
            .find(entity, id)
            .ok_or(AuthzError::RowMissing { entity, id })?;

        let membership = tables.membership_for(principal);
        let request = AccessRequest::delete(principal, existing);
        ensure_allowed(engine::evaluate(&membership, &request)?)?;

        tables.remove(entity, id);
        debug!(entity = %entity, id = %id, "row deleted");
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileSource for InMemoryStore {
    async fn primary_profile(&self, principal: PrincipalId) -> Result<Option<ProfileRow>> {
        Ok(self.tables.read().await.profiles.get(&principal).cloned())
    }

    async fn secondary_profile(&self, principal: PrincipalId) -> Result<Option<ProfileRow>> {
        Ok(self
            .tables
            .read()
            .await
            .user_profiles
            .get(&principal)
            .cloned())
    }
}

fn ensure_allowed(decision: AccessDecision) -> Result<()> {
    if decision.allowed {
        return Ok(());
    }

    let reason = match decision.reason {
        DecisionReason::Predicate { detail } => detail,
        DecisionReason::NoProfile => "principal has no profile".to_string(),
        DecisionReason::EvaluationFault { detail } => detail,
    };

    Err(AuthzError::Denied {
        entity: decision.entity,
        operation: decision.operation,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_system_kv_is_policy_free() {
        let store = InMemoryStore::new();

        // Backend path: no principal, no policy check, just storage
        store.system_kv().put("schema_version", json!(42));
        assert_eq!(store.system_kv().get("schema_version"), Some(json!(42)));
        assert_eq!(store.system_kv().remove("schema_version"), Some(json!(42)));
        assert!(store.system_kv().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_storage_error() {
        let store = InMemoryStore::new();
        let principal = Uuid::new_v4();
        let org = Uuid::new_v4();
        store
            .seed_profile(ProfileVariant::Primary, ProfileRow::new(principal, Some(org)))
            .await;

        let row = RowImage::new(EntityKind::Document, Uuid::new_v4())
            .with_organization(org)
            .with_owner(principal);

        store.insert(principal, row.clone()).await.unwrap();
        let result = store.insert(principal, row).await;
        assert!(matches!(result, Err(AuthzError::Storage(_))));
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let store = InMemoryStore::new();
        let principal = Uuid::new_v4();
        store
            .seed_profile(ProfileVariant::Primary, ProfileRow::new(principal, None))
            .await;

        let ghost = RowImage::new(EntityKind::Document, Uuid::new_v4()).with_owner(principal);
        let result = store
            .update(principal, ghost, &SessionContext::new())
            .await;
        assert!(matches!(result, Err(AuthzError::RowMissing { .. })));
    }

    #[tokio::test]
    async fn test_profile_rows_surface_as_images() {
        let store = InMemoryStore::new();
        let principal = Uuid::new_v4();
        let org = Uuid::new_v4();
        store
            .seed_profile(ProfileVariant::Primary, ProfileRow::new(principal, Some(org)))
            .await;

        let rows = store
            .select_rows(principal, EntityKind::Profile)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, principal);
        assert_eq!(rows[0].organization_id, Some(org));
        assert!(rows[0].attributes.contains_key(UPDATED_AT_ATTR));
    }
}
