//! Policy Evaluator
//!
//! Orchestrates principal resolution, registry lookup, and predicate
//! evaluation into per-row allow/deny decisions.
//!
//! ```text
//! Request → PrincipalResolver → MembershipIndex → EntityRegistry → Decision
//! ```
//!
//! The evaluator is read-only with respect to entity state: it renders a
//! decision from membership data and the row image(s) in the request. For
//! INSERT and UPDATE the with-check runs against the proposed post-write
//! image; UPDATE additionally requires the predicate to hold on the stored
//! image, so ownership cannot be reassigned away as a side channel.

pub mod decision;

pub use decision::{AccessDecision, AccessRequest, DecisionReason};

use crate::error::{AuthzError, Result};
use crate::membership::MembershipIndex;
use crate::registry::{self, PolicySpec};
use crate::resolver::{PrincipalResolver, ProfileSource};
use rowguard_core::{Operation, PrincipalId, RowImage};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Policy engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Log every decision at info level (denials always log at debug)
    pub trace_decisions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trace_decisions: true,
        }
    }
}

/// Row-level policy engine.
///
/// The default decision is deny and is not configurable: a registry hole is
/// a fatal configuration error, an unresolvable principal denies, and an
/// unevaluable row denies.
pub struct PolicyEngine {
    resolver: PrincipalResolver,
    config: EngineConfig,
}

impl PolicyEngine {
    /// Create an engine reading profiles through `source`
    pub fn new(source: Arc<dyn ProfileSource>) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    pub fn with_config(source: Arc<dyn ProfileSource>, config: EngineConfig) -> Self {
        Self {
            resolver: PrincipalResolver::new(source),
            config,
        }
    }

    /// Authorize one request.
    ///
    /// A principal with no profile is denied (not an error); a registry
    /// hole surfaces as [`AuthzError::NotRegistered`].
    pub async fn authorize(&self, request: &AccessRequest) -> Result<AccessDecision> {
        debug!(
            principal = %request.principal,
            entity = %request.entity,
            operation = %request.operation,
            "authorization request"
        );

        let membership = match self.resolver.resolve(request.principal).await {
            Ok(resolved) => resolved.membership,
            Err(AuthzError::NotFound(_)) => {
                debug!(principal = %request.principal, "principal has no profile, denying");
                return Ok(AccessDecision::deny(
                    request.entity,
                    request.operation,
                    DecisionReason::NoProfile,
                ));
            }
            Err(e) => return Err(e),
        };

        let decision = evaluate(&membership, request)?;

        if self.config.trace_decisions {
            info!(
                allowed = decision.allowed,
                entity = %decision.entity,
                operation = %decision.operation,
                "decision rendered"
            );
        }

        Ok(decision)
    }

    /// May `principal` read `row`?
    pub async fn can_select(&self, principal: PrincipalId, row: &RowImage) -> Result<AccessDecision> {
        self.authorize(&AccessRequest::select(principal, row.clone()))
            .await
    }

    /// May `principal` commit `proposed` as a new row? (with-check)
    pub async fn can_insert(
        &self,
        principal: PrincipalId,
        proposed: &RowImage,
    ) -> Result<AccessDecision> {
        self.authorize(&AccessRequest::insert(principal, proposed.clone()))
            .await
    }

    /// May `principal` replace `existing` with `proposed`?
    pub async fn can_update(
        &self,
        principal: PrincipalId,
        existing: &RowImage,
        proposed: &RowImage,
    ) -> Result<AccessDecision> {
        self.authorize(&AccessRequest::update(
            principal,
            existing.clone(),
            proposed.clone(),
        ))
        .await
    }

    /// May `principal` delete `existing`?
    pub async fn can_delete(
        &self,
        principal: PrincipalId,
        existing: &RowImage,
    ) -> Result<AccessDecision> {
        self.authorize(&AccessRequest::delete(principal, existing.clone()))
            .await
    }

    /// Row-granular visibility: keep the rows `principal` may read.
    ///
    /// Non-visible rows are absent from the result, never redacted. A
    /// principal with no profile sees nothing.
    pub async fn filter_visible(
        &self,
        principal: PrincipalId,
        rows: Vec<RowImage>,
    ) -> Result<Vec<RowImage>> {
        let membership = match self.resolver.resolve(principal).await {
            Ok(resolved) => resolved.membership,
            Err(AuthzError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut visible = Vec::with_capacity(rows.len());
        for row in rows {
            let request = AccessRequest::select(principal, row.clone());
            if evaluate(&membership, &request)?.allowed {
                visible.push(row);
            }
        }
        Ok(visible)
    }
}

/// Evaluate a request against an already-resolved membership index.
///
/// This is the synchronous core the guarded store calls inside its write
/// lock, so the with-check and the commit share one critical section.
pub fn evaluate(membership: &MembershipIndex, request: &AccessRequest) -> Result<AccessDecision> {
    // A registry hole is fatal no matter what else is wrong with the request
    let spec = registry::predicates_for(request.entity, request.operation)?;

    if membership.is_empty() {
        return Ok(AccessDecision::deny(
            request.entity,
            request.operation,
            DecisionReason::NoProfile,
        ));
    }

    let images = match images_to_check(request) {
        Ok(images) => images,
        Err(detail) => {
            warn!(
                entity = %request.entity,
                operation = %request.operation,
                detail = %detail,
                "unevaluable request, denying"
            );
            return Ok(AccessDecision::deny(
                request.entity,
                request.operation,
                DecisionReason::EvaluationFault { detail },
            ));
        }
    };

    for image in &images {
        if !spec.holds(membership, image) {
            return Ok(AccessDecision::deny(
                request.entity,
                request.operation,
                DecisionReason::Predicate {
                    detail: explain_failure(&spec, membership, image),
                },
            ));
        }
    }

    Ok(AccessDecision::allow(
        request.entity,
        request.operation,
        DecisionReason::Predicate {
            detail: spec
                .predicates
                .iter()
                .map(|p| p.name())
                .collect::<Vec<_>>()
                .join("+"),
        },
    ))
}

/// The row images the operation's predicate must hold on, or a fault
/// description when the request is malformed.
fn images_to_check(request: &AccessRequest) -> std::result::Result<Vec<&RowImage>, String> {
    let images = match request.operation {
        Operation::Select | Operation::Delete => vec![request
            .existing
            .as_ref()
            .ok_or("missing existing row image")?],
        Operation::Insert => vec![request
            .proposed
            .as_ref()
            .ok_or("missing proposed row image")?],
        Operation::Update => vec![
            request
                .existing
                .as_ref()
                .ok_or("missing existing row image")?,
            request
                .proposed
                .as_ref()
                .ok_or("missing proposed row image")?,
        ],
    };

    for image in &images {
        if image.entity != request.entity {
            return Err(format!(
                "row image belongs to {}, request targets {}",
                image.entity, request.entity
            ));
        }
    }

    Ok(images)
}

fn explain_failure(spec: &PolicySpec, membership: &MembershipIndex, image: &RowImage) -> String {
    match spec.combinator {
        crate::predicate::Combinator::All => spec
            .predicates
            .iter()
            .find(|p| !p.holds(membership, image))
            .map(|p| format!("{p} does not hold"))
            .unwrap_or_else(|| "predicate set not satisfied".to_string()),
        crate::predicate::Combinator::Any => {
            let names: Vec<_> = spec.predicates.iter().map(|p| p.name()).collect();
            format!("none of [{}] hold", names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowguard_core::{EntityKind, ProfileRow};
    use uuid::Uuid;

    fn membership(principal: PrincipalId, org: Uuid) -> MembershipIndex {
        MembershipIndex::from_rows(
            principal,
            Some(&ProfileRow::new(principal, Some(org))),
            Some(&ProfileRow::new(principal, None)),
        )
    }

    #[test]
    fn test_evaluate_select_by_org_membership() {
        let principal = Uuid::new_v4();
        let org = Uuid::new_v4();
        let index = membership(principal, org);

        let row = RowImage::new(EntityKind::Document, Uuid::new_v4())
            .with_organization(org)
            .with_owner(Uuid::new_v4());
        let decision = evaluate(&index, &AccessRequest::select(principal, row)).unwrap();
        assert!(decision.allowed);

        let foreign = RowImage::new(EntityKind::Document, Uuid::new_v4())
            .with_organization(Uuid::new_v4());
        let decision = evaluate(&index, &AccessRequest::select(principal, foreign)).unwrap();
        assert!(!decision.allowed);
    }

    #[test]
    fn test_evaluate_registry_hole_is_fatal() {
        let principal = Uuid::new_v4();
        let index = membership(principal, Uuid::new_v4());
        let org_row = RowImage::new(EntityKind::Organization, Uuid::new_v4());

        let result = evaluate(&index, &AccessRequest::delete(principal, org_row));
        assert!(matches!(result, Err(AuthzError::NotRegistered { .. })));
    }

    #[test]
    fn test_evaluate_empty_membership_denies() {
        let principal = Uuid::new_v4();
        let index = MembershipIndex::from_rows(principal, None, None);

        let row = RowImage::new(EntityKind::Profile, principal);
        let decision = evaluate(&index, &AccessRequest::select(principal, row)).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::NoProfile);
    }

    #[test]
    fn test_evaluate_entity_mismatch_denies_fail_closed() {
        let principal = Uuid::new_v4();
        let index = membership(principal, Uuid::new_v4());

        let mut request = AccessRequest::select(
            principal,
            RowImage::new(EntityKind::Document, Uuid::new_v4()),
        );
        request.entity = EntityKind::RiskAssessment;

        let decision = evaluate(&index, &request).unwrap();
        assert!(!decision.allowed);
        assert!(matches!(
            decision.reason,
            DecisionReason::EvaluationFault { .. }
        ));
    }

    #[test]
    fn test_update_checks_both_images() {
        let principal = Uuid::new_v4();
        let org = Uuid::new_v4();
        let index = membership(principal, org);

        let mine = RowImage::new(EntityKind::Document, Uuid::new_v4())
            .with_organization(org)
            .with_owner(principal);
        let reassigned = RowImage {
            user_id: Some(Uuid::new_v4()),
            ..mine.clone()
        };

        // Keeping ownership: allowed
        let decision = evaluate(
            &index,
            &AccessRequest::update(principal, mine.clone(), mine.clone()),
        )
        .unwrap();
        assert!(decision.allowed);

        // Reassigning ownership away: the proposed image fails
        let decision = evaluate(
            &index,
            &AccessRequest::update(principal, mine, reassigned),
        )
        .unwrap();
        assert!(!decision.allowed);
    }
}
