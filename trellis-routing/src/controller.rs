//! Controller blueprints and the naming-convention resolver.
//!
//! Controllers describe their routable actions through an explicit
//! capability interface instead of runtime introspection: a
//! [`ControllerBlueprint`] lists action names following the camel-case
//! verb-prefix convention (`getProfile`, `postStore`, ...) together with
//! their declared parameters. The [`ControllerRegistry`] resolves controller
//! names for [`resource`]/[`controller`] registration.
//!
//! [`resource`]: crate::builder::RouteBuilder::resource
//! [`controller`]: crate::builder::RouteBuilder::controller

use std::fmt;
use std::sync::Arc;

use convert_case::{Case, Casing};
use indexmap::IndexMap;
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::{RoutingError, RoutingResult};
use crate::http::Method;

/// A declared action parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    name: SmolStr,
    default: Option<Value>,
}

impl ParamSpec {
    /// A required parameter.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// A parameter with a default value.
    pub fn with_default(name: impl Into<SmolStr>, default: Value) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default value, if declared.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// A routable controller action: a convention-following name plus its
/// declared parameters in order.
#[derive(Debug, Clone)]
pub struct ActionSpec {
    name: SmolStr,
    params: Vec<ParamSpec>,
}

impl ActionSpec {
    /// Create an action with no parameters.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append a declared parameter.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Action name as declared on the controller.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters, in declaration order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }
}

/// Capability interface a routable controller type exposes.
pub trait ControllerBlueprint: Send + Sync {
    /// Canonical controller name used in action references.
    fn name(&self) -> &str;

    /// The controller's public actions, in declaration order.
    fn actions(&self) -> Vec<ActionSpec>;
}

/// A blueprint assembled from an explicit action table.
#[derive(Debug, Clone)]
pub struct TableBlueprint {
    name: SmolStr,
    actions: Vec<ActionSpec>,
}

impl TableBlueprint {
    /// Create an empty blueprint for the named controller.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Append an action.
    pub fn action(mut self, action: ActionSpec) -> Self {
        self.actions.push(action);
        self
    }
}

impl ControllerBlueprint for TableBlueprint {
    fn name(&self) -> &str {
        &self.name
    }

    fn actions(&self) -> Vec<ActionSpec> {
        self.actions.clone()
    }
}

/// Registry mapping controller names to blueprints.
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: IndexMap<SmolStr, Arc<dyn ControllerBlueprint>>,
}

impl ControllerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blueprint under its own name.
    pub fn register(&mut self, blueprint: impl ControllerBlueprint + 'static) -> &mut Self {
        let name = SmolStr::from(blueprint.name());
        self.controllers.insert(name, Arc::new(blueprint));
        self
    }

    /// Resolve a controller by name.
    pub fn resolve(&self, name: &str) -> RoutingResult<Arc<dyn ControllerBlueprint>> {
        self.controllers
            .get(name)
            .cloned()
            .ok_or_else(|| RoutingError::unknown_controller(name))
    }

    /// Check whether a controller is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.controllers.contains_key(name)
    }

    /// Number of registered controllers.
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Check whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.controllers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Result of splitting a convention action name into verb and action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VerbSplit {
    /// Recognized verb, `None` for match-any registration.
    pub method: Option<Method>,
    /// Snake-cased action name.
    pub action: String,
}

/// Split a camel-case action name at its first uppercase boundary.
///
/// When the leading segment is a recognized verb the remainder becomes the
/// action; otherwise the whole name is the action and the route matches any
/// verb. Action names are snake-cased either way.
pub(crate) fn split_action_name(name: &str) -> VerbSplit {
    match name.find(|c: char| c.is_ascii_uppercase()) {
        Some(index) if index > 0 => {
            let (prefix, rest) = name.split_at(index);
            match Method::from_verb_prefix(prefix) {
                Some(method) => VerbSplit {
                    method: Some(method),
                    action: rest.to_case(Case::Snake),
                },
                None => VerbSplit {
                    method: None,
                    action: name.to_case(Case::Snake),
                },
            }
        }
        _ => VerbSplit {
            method: None,
            action: name.to_case(Case::Snake),
        },
    }
}
