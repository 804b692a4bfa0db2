//! Tenant and ownership predicates
//!
//! The fixed predicate vocabulary the Entity Registry composes. Not a
//! policy language: each variant is one hard-coded comparison against the
//! membership index, and a missing scope column always evaluates false.

use crate::membership::MembershipIndex;
use rowguard_core::{ProfileVariant, RowImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A boolean function of (principal membership, row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// The row's primary key is the principal id (self-scoped profile rows)
    SelfRow,

    /// The row's `user_id` is the principal, resolved through the given
    /// profile table variant
    OwnedRow(ProfileVariant),

    /// The row's `organization_id` is one of the principal's organizations
    OrgMember,

    /// The row IS an organization the principal belongs to
    OrgVisible,
}

impl Predicate {
    /// Evaluate against a row image.
    ///
    /// Absent scope columns deny: a row with no `organization_id` or
    /// `user_id` is never a vacuous match.
    pub fn holds(&self, membership: &MembershipIndex, row: &RowImage) -> bool {
        match self {
            Predicate::SelfRow => row.id == membership.principal(),
            Predicate::OwnedRow(variant) => membership.owns_record(*variant, row.user_id),
            Predicate::OrgMember => match row.organization_id {
                Some(org) => membership.is_org_member(org),
                None => false,
            },
            Predicate::OrgVisible => membership.is_org_member(row.id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Predicate::SelfRow => "self_row",
            Predicate::OwnedRow(ProfileVariant::Primary) => "owned_row",
            Predicate::OwnedRow(ProfileVariant::Secondary) => "owned_row_secondary",
            Predicate::OrgMember => "org_member",
            Predicate::OrgVisible => "org_visible",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a predicate set combines.
///
/// Reads may be granted by any applicable predicate (co-tenant visibility
/// alongside self-scope); mutations require every predicate to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    /// Conjunction: every predicate must hold
    All,
    /// Disjunction: at least one predicate must hold
    Any,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowguard_core::{EntityKind, PrincipalId, ProfileRow};
    use uuid::Uuid;

    fn member_index(principal: PrincipalId, org: Uuid) -> MembershipIndex {
        MembershipIndex::from_rows(
            principal,
            Some(&ProfileRow::new(principal, Some(org))),
            Some(&ProfileRow::new(principal, None)),
        )
    }

    #[test]
    fn test_self_row() {
        let principal = Uuid::new_v4();
        let index = member_index(principal, Uuid::new_v4());

        let own = RowImage::new(EntityKind::Profile, principal);
        let other = RowImage::new(EntityKind::Profile, Uuid::new_v4());

        assert!(Predicate::SelfRow.holds(&index, &own));
        assert!(!Predicate::SelfRow.holds(&index, &other));
    }

    #[test]
    fn test_org_member_denies_null_scope() {
        let principal = Uuid::new_v4();
        let org = Uuid::new_v4();
        let index = member_index(principal, org);

        let scoped = RowImage::new(EntityKind::Document, Uuid::new_v4()).with_organization(org);
        let unscoped = RowImage::new(EntityKind::Document, Uuid::new_v4());

        assert!(Predicate::OrgMember.holds(&index, &scoped));
        assert!(!Predicate::OrgMember.holds(&index, &unscoped));
    }

    #[test]
    fn test_owned_row_variants() {
        let principal = Uuid::new_v4();
        let index = member_index(principal, Uuid::new_v4());

        let owned = RowImage::new(EntityKind::PortfolioGoal, Uuid::new_v4()).with_owner(principal);
        assert!(Predicate::OwnedRow(ProfileVariant::Secondary).holds(&index, &owned));

        // Same owner column, but the principal holds no profile in the
        // scoping variant
        let no_secondary = MembershipIndex::from_rows(
            principal,
            Some(&ProfileRow::new(principal, None)),
            None,
        );
        assert!(!Predicate::OwnedRow(ProfileVariant::Secondary).holds(&no_secondary, &owned));
    }

    #[test]
    fn test_org_visible() {
        let principal = Uuid::new_v4();
        let org = Uuid::new_v4();
        let index = member_index(principal, org);

        let own_org = RowImage::new(EntityKind::Organization, org);
        let other_org = RowImage::new(EntityKind::Organization, Uuid::new_v4());

        assert!(Predicate::OrgVisible.holds(&index, &own_org));
        assert!(!Predicate::OrgVisible.holds(&index, &other_org));
    }
}
