//! Decides once, at startup, which filter (if any) guards each operation.
//!
//! Operations declare two markers:
//! - `authenticated`: the operation as a whole requires a caller identity.
//! - a parameter with `auth = true`: the handler takes the caller identity as
//!   an argument; `optional = true` when that argument is an `Option`-like
//!   wrapper (`MaybeAuthCtx`) that tolerates an anonymous caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::routing::MethodRouter;
use serde::Deserialize;

use super::{SharedFilter, SuppressAbort, apply};

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub auth: bool,
    #[serde(default)]
    pub optional: bool,
}

impl Parameter {
    pub fn identity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auth: true,
            optional: false,
        }
    }

    pub fn optional_identity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auth: true,
            optional: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Operation {
    pub id: String,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub params: Vec<Parameter>,
}

impl Operation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }
}

#[derive(Clone, Default)]
pub enum FilterBinding {
    /// No authentication markers.
    #[default]
    None,
    /// Authentication was asked for but no filter is configured; the host
    /// router's own behavior applies.
    Deferred,
    /// Failure blocks the call.
    Mandatory(SharedFilter),
    /// Authentication is attempted, failure is tolerated.
    Optional(SharedFilter),
}

impl FilterBinding {
    pub fn kind(&self) -> &'static str {
        match self {
            FilterBinding::None => "none",
            FilterBinding::Deferred => "deferred",
            FilterBinding::Mandatory(_) => "mandatory",
            FilterBinding::Optional(_) => "optional",
        }
    }

    pub fn apply<S>(&self, route: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self {
            FilterBinding::None | FilterBinding::Deferred => route,
            FilterBinding::Mandatory(filter) | FilterBinding::Optional(filter) => {
                apply(route, filter.clone())
            }
        }
    }
}

impl fmt::Debug for FilterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Builds [`FilterBinding`]s from operation metadata.
#[derive(Clone, Default)]
pub struct BindingResolver {
    filter: Option<SharedFilter>,
}

impl BindingResolver {
    pub fn new(filter: Option<SharedFilter>) -> Self {
        Self { filter }
    }

    pub fn resolve(&self, op: &Operation) -> FilterBinding {
        if op.authenticated {
            return match &self.filter {
                Some(filter) => FilterBinding::Mandatory(filter.clone()),
                None => FilterBinding::Deferred,
            };
        }

        let Some(param) = op.params.iter().find(|p| p.auth) else {
            return FilterBinding::None;
        };

        match (&self.filter, param.optional) {
            (Some(filter), true) => {
                FilterBinding::Optional(Arc::new(SuppressAbort::new(filter.clone())))
            }
            (Some(filter), false) => FilterBinding::Mandatory(filter.clone()),
            (None, _) => FilterBinding::Deferred,
        }
    }

    pub fn resolve_all<'a>(&self, ops: impl IntoIterator<Item = &'a Operation>) -> BindingTable {
        let bindings: HashMap<String, FilterBinding> = ops
            .into_iter()
            .map(|op| (op.id.clone(), self.resolve(op)))
            .collect();

        let count = |kind: &str| bindings.values().filter(|b| b.kind() == kind).count();
        tracing::info!(
            operations = bindings.len(),
            mandatory = count("mandatory"),
            optional = count("optional"),
            deferred = count("deferred"),
            "authentication bindings resolved"
        );

        BindingTable { bindings }
    }
}

/// `operation id -> FilterBinding`, fixed after startup.
#[derive(Clone, Default, Debug)]
pub struct BindingTable {
    bindings: HashMap<String, FilterBinding>,
}

impl BindingTable {
    pub fn get(&self, operation_id: &str) -> Option<&FilterBinding> {
        self.bindings.get(operation_id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Guards `route` with the filter bound to `operation_id`.
    pub fn apply<S>(&self, operation_id: &str, route: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self.bindings.get(operation_id) {
            Some(binding) => binding.apply(route),
            None => {
                tracing::warn!(operation_id, "no binding resolved for operation");
                route
            }
        }
    }
}
