//! Principal Resolver
//!
//! Maps a caller identity to its profile rows and organization membership.
//! Leaf dependency for every policy check: the resolver reads through the
//! [`ProfileSource`] seam and rebuilds the [`MembershipIndex`] on each call.
//! No caching across requests; pure read.

use crate::error::{AuthzError, Result};
use crate::membership::MembershipIndex;
use async_trait::async_trait;
use rowguard_core::{OrgId, PrincipalId, ProfileRow};
use std::sync::Arc;
use tracing::debug;

/// Read access to the two profile tables, keyed by primary key.
///
/// Implemented by the storage backend; lookups must be index-backed
/// (primary-key access), never scans.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Row from `profiles` for this principal, if any
    async fn primary_profile(&self, principal: PrincipalId) -> Result<Option<ProfileRow>>;

    /// Row from `user_profiles` for this principal, if any
    async fn secondary_profile(&self, principal: PrincipalId) -> Result<Option<ProfileRow>>;
}

/// Outcome of resolving a principal
#[derive(Debug, Clone)]
pub struct ResolvedPrincipal {
    /// The resolved principal id
    pub principal: PrincipalId,

    /// Row from the primary profile table, if any
    pub profile: Option<ProfileRow>,

    /// Row from the secondary profile table, if any
    pub user_profile: Option<ProfileRow>,

    /// Organization derived from the primary profile
    pub organization_id: Option<OrgId>,

    /// Membership index rebuilt for this resolution
    pub membership: MembershipIndex,
}

/// Resolves caller identities against the profile tables
pub struct PrincipalResolver {
    source: Arc<dyn ProfileSource>,
}

impl PrincipalResolver {
    pub fn new(source: Arc<dyn ProfileSource>) -> Self {
        Self { source }
    }

    /// Resolve a principal to its profiles and membership.
    ///
    /// Returns [`AuthzError::NotFound`] when no profile row exists in either
    /// variant: the principal is authenticated but carries no authorization
    /// scope, and callers must deny rather than error on subsequent checks.
    pub async fn resolve(&self, principal: PrincipalId) -> Result<ResolvedPrincipal> {
        let profile = self.source.primary_profile(principal).await?;
        let user_profile = self.source.secondary_profile(principal).await?;

        if profile.is_none() && user_profile.is_none() {
            debug!(%principal, "no profile in either variant");
            return Err(AuthzError::NotFound(principal));
        }

        let membership =
            MembershipIndex::from_rows(principal, profile.as_ref(), user_profile.as_ref());
        let organization_id = profile.as_ref().and_then(|p| p.organization_id);

        debug!(
            %principal,
            organizations = membership.organizations_of().len(),
            "principal resolved"
        );

        Ok(ResolvedPrincipal {
            principal,
            profile,
            user_profile,
            organization_id,
            membership,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;
    use uuid::Uuid;

    struct MapSource {
        primary: RwLock<HashMap<PrincipalId, ProfileRow>>,
        secondary: RwLock<HashMap<PrincipalId, ProfileRow>>,
    }

    impl MapSource {
        fn new() -> Self {
            Self {
                primary: RwLock::new(HashMap::new()),
                secondary: RwLock::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl ProfileSource for MapSource {
        async fn primary_profile(&self, principal: PrincipalId) -> Result<Option<ProfileRow>> {
            Ok(self.primary.read().await.get(&principal).cloned())
        }

        async fn secondary_profile(&self, principal: PrincipalId) -> Result<Option<ProfileRow>> {
            Ok(self.secondary.read().await.get(&principal).cloned())
        }
    }

    #[tokio::test]
    async fn test_resolve_with_primary_profile() {
        let source = Arc::new(MapSource::new());
        let principal = Uuid::new_v4();
        let org = Uuid::new_v4();
        source
            .primary
            .write()
            .await
            .insert(principal, ProfileRow::new(principal, Some(org)));

        let resolver = PrincipalResolver::new(source);
        let resolved = resolver.resolve(principal).await.unwrap();

        assert_eq!(resolved.organization_id, Some(org));
        assert!(resolved.membership.is_org_member(org));
        assert!(resolved.user_profile.is_none());
    }

    #[tokio::test]
    async fn test_resolve_unknown_principal_is_not_found() {
        let resolver = PrincipalResolver::new(Arc::new(MapSource::new()));
        let principal = Uuid::new_v4();

        match resolver.resolve(principal).await {
            Err(AuthzError::NotFound(p)) => assert_eq!(p, principal),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_secondary_only_principal() {
        let source = Arc::new(MapSource::new());
        let principal = Uuid::new_v4();
        source
            .secondary
            .write()
            .await
            .insert(principal, ProfileRow::new(principal, None));

        let resolver = PrincipalResolver::new(source);
        let resolved = resolver.resolve(principal).await.unwrap();

        assert!(resolved.profile.is_none());
        assert!(resolved.user_profile.is_some());
        assert_eq!(resolved.organization_id, None);
        assert!(resolved.membership.organizations_of().is_empty());
    }
}
