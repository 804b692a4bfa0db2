//! Entity Registry
//!
//! The static entity → (operation → predicate set) mapping. The entity set
//! is closed and known at build time; there is no runtime registration.
//! Holes in the table are deliberate: attempting an unregistered operation
//! is a configuration fault and must block, never fail open.

use crate::error::{AuthzError, Result};
use crate::membership::MembershipIndex;
use crate::predicate::{Combinator, Predicate};
use rowguard_core::{EntityKind, Operation, ProfileVariant, RowImage};

/// The predicate composition registered for one (entity, operation) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicySpec {
    pub predicates: &'static [Predicate],
    pub combinator: Combinator,
}

impl PolicySpec {
    const fn any(predicates: &'static [Predicate]) -> Self {
        Self {
            predicates,
            combinator: Combinator::Any,
        }
    }

    const fn all(predicates: &'static [Predicate]) -> Self {
        Self {
            predicates,
            combinator: Combinator::All,
        }
    }

    /// Evaluate the composed predicate set against one row image
    pub fn holds(&self, membership: &MembershipIndex, row: &RowImage) -> bool {
        match self.combinator {
            Combinator::All => self.predicates.iter().all(|p| p.holds(membership, row)),
            Combinator::Any => self.predicates.iter().any(|p| p.holds(membership, row)),
        }
    }
}

const SELF_ROW: &[Predicate] = &[Predicate::SelfRow];
const SELF_OR_CO_TENANT: &[Predicate] = &[Predicate::SelfRow, Predicate::OrgMember];
const ORG_MEMBER: &[Predicate] = &[Predicate::OrgMember];
const ORG_VISIBLE: &[Predicate] = &[Predicate::OrgVisible];
const OWNER: &[Predicate] = &[Predicate::OwnedRow(ProfileVariant::Primary)];
const OWNER_IN_ORG: &[Predicate] = &[
    Predicate::OwnedRow(ProfileVariant::Primary),
    Predicate::OrgMember,
];
const OWNER_SECONDARY: &[Predicate] = &[Predicate::OwnedRow(ProfileVariant::Secondary)];

/// Look up the registered predicate composition, `None` for deliberate
/// holes (e.g. Organization mutations).
///
/// SELECT may carry several independently-granting predicates (`Any`);
/// mutations are a single authoritative composition (`All`). Co-tenant
/// visibility never broadens writes.
pub fn policy_for(entity: EntityKind, operation: Operation) -> Option<PolicySpec> {
    use EntityKind::*;
    use Operation::*;

    match (entity, operation) {
        // Self-scoped profiles; SELECT additionally grants co-tenant reads
        // on the primary table only
        (Profile, Select) => Some(PolicySpec::any(SELF_OR_CO_TENANT)),
        (Profile, Insert) | (Profile, Update) => Some(PolicySpec::all(SELF_ROW)),
        (Profile, Delete) => None,

        (UserProfile, Select) => Some(PolicySpec::any(SELF_ROW)),
        (UserProfile, Insert) | (UserProfile, Update) => Some(PolicySpec::all(SELF_ROW)),
        (UserProfile, Delete) => None,

        // Tenants are read-only through the policy surface
        (Organization, Select) => Some(PolicySpec::any(ORG_VISIBLE)),
        (Organization, _) => None,

        // Owned entities: tenant-wide reads, owner-only writes, and inserts
        // must satisfy ownership AND membership together
        (Document | ComplianceQuery | RiskAssessment, Select) => Some(PolicySpec::any(ORG_MEMBER)),
        (Document | ComplianceQuery | RiskAssessment, Insert) => Some(PolicySpec::all(OWNER_IN_ORG)),
        (Document | ComplianceQuery | RiskAssessment, Update)
        | (Document | ComplianceQuery | RiskAssessment, Delete) => Some(PolicySpec::all(OWNER)),

        // Preference entities: strictly owner-scoped through the secondary
        // profile table, no organization dimension
        (DealSourcingPreference | PortfolioGoal | CommunityPreference, _) => {
            Some(PolicySpec::all(OWNER_SECONDARY))
        }
    }
}

/// Like [`policy_for`], but a hole is a fatal configuration error
pub fn predicates_for(entity: EntityKind, operation: Operation) -> Result<PolicySpec> {
    policy_for(entity, operation).ok_or(AuthzError::NotRegistered { entity, operation })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_select_is_or_broadened() {
        let spec = policy_for(EntityKind::Profile, Operation::Select).unwrap();
        assert_eq!(spec.combinator, Combinator::Any);
        assert_eq!(spec.predicates.len(), 2);
    }

    #[test]
    fn test_user_profile_select_is_not_broadened() {
        let spec = policy_for(EntityKind::UserProfile, Operation::Select).unwrap();
        assert_eq!(spec.predicates, SELF_ROW);
    }

    #[test]
    fn test_owned_entity_insert_is_conjunction() {
        for entity in [
            EntityKind::Document,
            EntityKind::ComplianceQuery,
            EntityKind::RiskAssessment,
        ] {
            let spec = policy_for(entity, Operation::Insert).unwrap();
            assert_eq!(spec.combinator, Combinator::All);
            assert_eq!(spec.predicates.len(), 2);
        }
    }

    #[test]
    fn test_deliberate_holes_error() {
        assert!(policy_for(EntityKind::Profile, Operation::Delete).is_none());
        assert!(policy_for(EntityKind::Organization, Operation::Update).is_none());

        match predicates_for(EntityKind::Organization, Operation::Insert) {
            Err(AuthzError::NotRegistered { entity, operation }) => {
                assert_eq!(entity, EntityKind::Organization);
                assert_eq!(operation, Operation::Insert);
            }
            other => panic!("expected NotRegistered, got {other:?}"),
        }
    }

    #[test]
    fn test_every_entity_has_a_select_policy_except_none() {
        // Every governed entity is readable by someone; only mutations
        // carry deliberate holes.
        for entity in EntityKind::ALL {
            assert!(
                policy_for(entity, Operation::Select).is_some(),
                "{entity} has no select policy"
            );
        }
    }

    #[test]
    fn test_mutations_never_use_any_combinator() {
        for entity in EntityKind::ALL {
            for op in [Operation::Insert, Operation::Update, Operation::Delete] {
                if let Some(spec) = policy_for(entity, op) {
                    assert_eq!(
                        spec.combinator,
                        Combinator::All,
                        "{entity}/{op} must not OR-broaden"
                    );
                }
            }
        }
    }
}
