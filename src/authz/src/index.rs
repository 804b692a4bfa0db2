//! Index requirement declarations
//!
//! The engine filters by equality on a fixed set of foreign-key columns;
//! each must be index-backed or every policy check degenerates to a full
//! scan. The engine does not create indexes itself; it declares the
//! requirement, and the deployment process audits the live schema against
//! it. Indexes backing no declared predicate are flagged for removal.

use serde::Serialize;
use std::fmt;
use tracing::warn;

/// One required index: an equality-lookup column on a governed table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexRequirement {
    pub table: &'static str,
    pub column: &'static str,
}

impl fmt::Display for IndexRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

const fn req(table: &'static str, column: &'static str) -> IndexRequirement {
    IndexRequirement { table, column }
}

/// Every foreign-key column a registered predicate filters by
pub const REQUIRED_INDEXES: [IndexRequirement; 7] = [
    req("profiles", "organization_id"),
    req("documents", "user_id"),
    req("compliance_queries", "user_id"),
    req("risk_assessments", "user_id"),
    req("deal_sourcing_preferences", "user_id"),
    req("portfolio_goals", "user_id"),
    req("community_preferences", "user_id"),
];

/// Result of auditing a live schema's indexes against [`REQUIRED_INDEXES`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexAudit {
    /// Required but absent: policy checks on these columns will scan
    pub missing: Vec<IndexRequirement>,

    /// Present but backing no declared predicate: correctness-neutral,
    /// maintenance-negative; should be removed
    pub unused: Vec<(String, String)>,
}

impl IndexAudit {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unused.is_empty()
    }
}

/// Audit the indexes reported by the deployment (as `(table, column)`
/// pairs) against the declared requirements.
pub fn audit_indexes(existing: &[(String, String)]) -> IndexAudit {
    let missing: Vec<IndexRequirement> = REQUIRED_INDEXES
        .iter()
        .filter(|r| {
            !existing
                .iter()
                .any(|(t, c)| t == r.table && c == r.column)
        })
        .copied()
        .collect();

    let unused: Vec<(String, String)> = existing
        .iter()
        .filter(|(t, c)| {
            !REQUIRED_INDEXES
                .iter()
                .any(|r| r.table == t && r.column == c)
        })
        .cloned()
        .collect();

    for (table, column) in &unused {
        warn!(
            table = %table,
            column = %column,
            "index backs no declared predicate, flag for removal"
        );
    }
    for requirement in &missing {
        warn!(%requirement, "required index missing, lookups will scan");
    }

    IndexAudit { missing, unused }
}
