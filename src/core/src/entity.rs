//! Entity taxonomy for the governed tables
//!
//! The set of governed entities is closed and known at build time. The
//! internal key-value table is deliberately absent from [`EntityKind`]:
//! it is backend-internal and carries no policy surface.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A governed entity (one per protected table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Primary profile table (`profiles`): one row per principal, carries
    /// the tenant reference.
    Profile,

    /// Secondary profile table (`user_profiles`): one row per principal,
    /// scopes the preference entities. No tenant dimension.
    UserProfile,

    /// Tenant boundary (`organizations`).
    Organization,

    /// Tenant-scoped, owner-mutable document rows.
    Document,

    /// Compliance query rows; tenant-scoped reads, owner-scoped writes.
    ComplianceQuery,

    /// Risk assessment rows; tenant-scoped reads, owner-scoped writes.
    RiskAssessment,

    /// Per-user deal sourcing preferences (owner-only).
    DealSourcingPreference,

    /// Per-user portfolio goals (owner-only).
    PortfolioGoal,

    /// Per-user community preferences (owner-only).
    CommunityPreference,
}

impl EntityKind {
    /// All governed entities, in declaration order.
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Profile,
        EntityKind::UserProfile,
        EntityKind::Organization,
        EntityKind::Document,
        EntityKind::ComplianceQuery,
        EntityKind::RiskAssessment,
        EntityKind::DealSourcingPreference,
        EntityKind::PortfolioGoal,
        EntityKind::CommunityPreference,
    ];

    /// Underlying table name
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Profile => "profiles",
            EntityKind::UserProfile => "user_profiles",
            EntityKind::Organization => "organizations",
            EntityKind::Document => "documents",
            EntityKind::ComplianceQuery => "compliance_queries",
            EntityKind::RiskAssessment => "risk_assessments",
            EntityKind::DealSourcingPreference => "deal_sourcing_preferences",
            EntityKind::PortfolioGoal => "portfolio_goals",
            EntityKind::CommunityPreference => "community_preferences",
        }
    }

    /// Rows carry both `organization_id` and `user_id`
    pub fn is_owned(&self) -> bool {
        matches!(
            self,
            EntityKind::Document | EntityKind::ComplianceQuery | EntityKind::RiskAssessment
        )
    }

    /// Rows carry only `user_id`, scoped through the secondary profile table
    pub fn is_preference(&self) -> bool {
        matches!(
            self,
            EntityKind::DealSourcingPreference
                | EntityKind::PortfolioGoal
                | EntityKind::CommunityPreference
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

/// CRUD operation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// Parse from a lowercase operation name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "select" => Some(Operation::Select),
            "insert" => Some(Operation::Insert),
            "update" => Some(Operation::Update),
            "delete" => Some(Operation::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Whether the operation writes row state
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Operation::Select)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which profile table scopes a membership or ownership lookup.
///
/// The two variants are independent: a principal may hold a row in one,
/// both, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileVariant {
    /// `profiles`: scopes the owned entities and carries `organization_id`
    Primary,
    /// `user_profiles`: scopes the preference entities
    Secondary,
}

impl ProfileVariant {
    pub fn entity(&self) -> EntityKind {
        match self {
            ProfileVariant::Primary => EntityKind::Profile,
            ProfileVariant::Secondary => EntityKind::UserProfile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_parse_roundtrip() {
        for op in [
            Operation::Select,
            Operation::Insert,
            Operation::Update,
            Operation::Delete,
        ] {
            assert_eq!(Operation::parse(op.as_str()), Some(op));
        }
        assert_eq!(Operation::parse("truncate"), None);
    }

    #[test]
    fn test_entity_classification() {
        assert!(EntityKind::Document.is_owned());
        assert!(EntityKind::RiskAssessment.is_owned());
        assert!(!EntityKind::Profile.is_owned());

        assert!(EntityKind::PortfolioGoal.is_preference());
        assert!(!EntityKind::ComplianceQuery.is_preference());
    }

    #[test]
    fn test_table_names_are_unique() {
        let mut names: Vec<_> = EntityKind::ALL.iter().map(|e| e.table_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), EntityKind::ALL.len());
    }

    #[test]
    fn test_profile_variant_entities() {
        assert_eq!(ProfileVariant::Primary.entity(), EntityKind::Profile);
        assert_eq!(ProfileVariant::Secondary.entity(), EntityKind::UserProfile);
    }
}
