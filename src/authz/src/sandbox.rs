//! Secure Function Sandbox
//!
//! Privileged helper routines (the timestamp trigger, for one) execute
//! under a binding table fixed when the sandbox is built. Name resolution
//! never consults caller session state, so a caller cannot shadow a
//! privileged routine with one of its own and have it run with the
//! policy layer's authority.

use crate::error::{AuthzError, Result};
use chrono::Utc;
use rowguard_core::RowImage;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A privileged helper: mutates a row image under engine authority
pub type PrivilegedFn = Arc<dyn Fn(&mut RowImage) -> Result<()> + Send + Sync>;

/// Name of the timestamp-maintenance routine
pub const TOUCH_UPDATED_AT: &str = "touch_updated_at";

/// Attribute the timestamp routine maintains
pub const UPDATED_AT_ATTR: &str = "updated_at";

/// Caller-controlled session state.
///
/// Sessions may bind any names they like; [`FunctionSandbox::run_privileged`]
/// ignores these bindings entirely.
#[derive(Default, Clone)]
pub struct SessionContext {
    bindings: HashMap<String, PrivilegedFn>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name in the caller's own resolution scope
    pub fn bind(&mut self, name: impl Into<String>, f: PrivilegedFn) {
        self.bindings.insert(name.into(), f);
    }

    /// Number of caller bindings (diagnostics only)
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

/// Builder for the pinned binding table
#[derive(Default)]
pub struct SandboxBuilder {
    bindings: HashMap<String, PrivilegedFn>,
}

impl SandboxBuilder {
    /// Bind a privileged routine. Last binding of a name wins; after
    /// `build` the table is immutable.
    pub fn bind(mut self, name: impl Into<String>, f: PrivilegedFn) -> Self {
        self.bindings.insert(name.into(), f);
        self
    }

    pub fn build(self) -> FunctionSandbox {
        FunctionSandbox {
            bindings: self.bindings,
        }
    }
}

/// Executes privileged routines against a binding table pinned at build
/// time. The builder is consumed on `build`, so no bindings can be added
/// or replaced once the sandbox exists.
pub struct FunctionSandbox {
    bindings: HashMap<String, PrivilegedFn>,
}

impl FunctionSandbox {
    pub fn builder() -> SandboxBuilder {
        SandboxBuilder::default()
    }

    /// Sandbox with the standard routines bound (currently the timestamp
    /// trigger)
    pub fn with_defaults() -> Self {
        Self::builder()
            .bind(TOUCH_UPDATED_AT, Arc::new(touch_updated_at) as PrivilegedFn)
            .build()
    }

    /// Run the privileged routine bound under `name`.
    ///
    /// Resolution is pinned: only the build-time table is consulted, and
    /// `session` bindings are never executed, even under the same name.
    pub fn run_privileged(
        &self,
        name: &str,
        session: &SessionContext,
        row: &mut RowImage,
    ) -> Result<()> {
        // Deliberately not resolved against `session`
        let _ = session;

        let routine = self
            .bindings
            .get(name)
            .ok_or_else(|| AuthzError::UnknownRoutine(name.to_string()))?;

        debug!(routine = name, entity = %row.entity, "running privileged routine");
        routine(row)
    }

    /// Whether a routine is bound (diagnostics only)
    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

/// Timestamp-maintenance routine: stamps `updated_at` with the current time
fn touch_updated_at(row: &mut RowImage) -> Result<()> {
    row.attributes.insert(
        UPDATED_AT_ATTR.to_string(),
        serde_json::Value::String(Utc::now().to_rfc3339()),
    );
    Ok(())
}
