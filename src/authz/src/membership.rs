//! Membership Index
//!
//! A per-principal snapshot of organization membership and ownership scope,
//! rebuilt by the Principal Resolver on each resolution call. Lookups are
//! equality-only and answered from keyed maps, standing in for the
//! foreign-key indexes the deployment declares (see [`crate::index`]).

use rowguard_core::{OrgId, PrincipalId, ProfileRow, ProfileVariant};
use std::collections::BTreeSet;

/// Indexed membership state for one principal.
///
/// Built from the zero-or-one profile row the principal holds in each
/// profile table variant. A principal with no profile in either variant has
/// an empty index; every predicate then evaluates false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipIndex {
    principal: PrincipalId,
    organizations: BTreeSet<OrgId>,
    has_primary: bool,
    has_secondary: bool,
}

impl MembershipIndex {
    /// Build the index from the principal's profile rows.
    ///
    /// `primary` is the row from `profiles`, `secondary` the row from
    /// `user_profiles`. Only the primary variant contributes organization
    /// membership.
    pub fn from_rows(
        principal: PrincipalId,
        primary: Option<&ProfileRow>,
        secondary: Option<&ProfileRow>,
    ) -> Self {
        let mut organizations = BTreeSet::new();
        if let Some(org) = primary.and_then(|p| p.organization_id) {
            organizations.insert(org);
        }

        Self {
            principal,
            organizations,
            has_primary: primary.is_some(),
            has_secondary: secondary.is_some(),
        }
    }

    /// The principal this index was resolved for
    pub fn principal(&self) -> PrincipalId {
        self.principal
    }

    /// Organizations the principal belongs to (zero or one per profile
    /// variant in the current data model, kept as a set for the contract)
    pub fn organizations_of(&self) -> &BTreeSet<OrgId> {
        &self.organizations
    }

    /// Whether the principal is a member of `org`
    pub fn is_org_member(&self, org: OrgId) -> bool {
        self.organizations.contains(&org)
    }

    /// Whether the principal holds a profile row in `variant`
    pub fn has_profile(&self, variant: ProfileVariant) -> bool {
        match variant {
            ProfileVariant::Primary => self.has_primary,
            ProfileVariant::Secondary => self.has_secondary,
        }
    }

    /// Ownership check: `owner` must equal the principal, and the principal
    /// must hold a profile row in the scoping variant. A missing owner
    /// column never matches.
    pub fn owns_record(&self, variant: ProfileVariant, owner: Option<PrincipalId>) -> bool {
        self.has_profile(variant) && owner == Some(self.principal)
    }

    /// True when the principal has no profile in either variant
    pub fn is_empty(&self) -> bool {
        !self.has_primary && !self.has_secondary
    }
}
