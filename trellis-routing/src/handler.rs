//! Named request handlers and the permission guard.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;
use tracing::debug;

use crate::http::{Request, Response};

/// Body of the response the permission guard denies requests with.
pub const ACCESS_DENIED_BODY: &str = "Access denied";

type BeforeFn = Arc<dyn Fn(&Request) -> Option<Response> + Send + Sync>;
type AfterFn = Arc<dyn Fn(&Request, &mut Response) + Send + Sync>;

/// A named handler that runs before a route's action.
///
/// Returning `Some(response)` short-circuits the request; `None` lets it
/// continue. Handlers carry a name so attached middleware stays observable
/// after registration.
#[derive(Clone)]
pub struct BeforeHandler {
    name: SmolStr,
    run: BeforeFn,
}

impl BeforeHandler {
    /// Create a named before-handler.
    pub fn new(
        name: impl Into<SmolStr>,
        run: impl Fn(&Request) -> Option<Response> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            run: Arc::new(run),
        }
    }

    /// The handler's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the handler against a request.
    pub fn call(&self, request: &Request) -> Option<Response> {
        (self.run)(request)
    }
}

impl fmt::Debug for BeforeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeforeHandler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A named handler that runs after a route's action, with access to the
/// response.
#[derive(Clone)]
pub struct AfterHandler {
    name: SmolStr,
    run: AfterFn,
}

impl AfterHandler {
    /// Create a named after-handler.
    pub fn new(
        name: impl Into<SmolStr>,
        run: impl Fn(&Request, &mut Response) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            run: Arc::new(run),
        }
    }

    /// The handler's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the handler against a request/response pair.
    pub fn call(&self, request: &Request, response: &mut Response) {
        (self.run)(request, response)
    }
}

impl fmt::Debug for AfterHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterHandler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Permission-checking collaborator.
pub trait PermissionChecker: Send + Sync {
    /// Check whether the named permission is granted.
    fn check(&self, permission: &str) -> bool;
}

impl<F> PermissionChecker for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn check(&self, permission: &str) -> bool {
        self(permission)
    }
}

/// A checker that grants every permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn check(&self, _permission: &str) -> bool {
        true
    }
}

/// Build the before-handler guarding a route behind a named permission.
///
/// The guard consults the checker at request time and denies with a fixed
/// `401` response. Without a configured checker the guard denies every
/// request; granting by default would turn a wiring mistake into an
/// authorization hole.
pub(crate) fn permission_guard(
    permission: &str,
    checker: Option<Arc<dyn PermissionChecker>>,
) -> BeforeHandler {
    let name = SmolStr::from(format!("permission:{permission}"));
    let permission = SmolStr::from(permission);
    BeforeHandler::new(name, move |_request| {
        let granted = checker
            .as_ref()
            .is_some_and(|checker| checker.check(&permission));
        if granted {
            None
        } else {
            debug!(permission = %permission, "permission denied");
            Some(Response::unauthorized().with_body(ACCESS_DENIED_BODY))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_before_handler_call() {
        let handler = BeforeHandler::new("halt", |_| Some(Response::new(503)));
        assert_eq!(handler.name(), "halt");

        let request = Request::new(Method::Get, "/x");
        assert_eq!(handler.call(&request).map(|r| r.status), Some(503));
    }

    #[test]
    fn test_after_handler_call() {
        let handler = AfterHandler::new("tag", |_, response: &mut Response| {
            response.headers.insert("X-Tag".into(), "1".into());
        });

        let request = Request::new(Method::Get, "/x");
        let mut response = Response::ok();
        handler.call(&request, &mut response);
        assert_eq!(response.headers["X-Tag"], "1");
    }

    #[test]
    fn test_guard_grants() {
        let checker: Arc<dyn PermissionChecker> = Arc::new(|name: &str| name == "posts.write");
        let guard = permission_guard("posts.write", Some(checker));

        assert_eq!(guard.name(), "permission:posts.write");
        assert!(guard.call(&Request::new(Method::Post, "/posts")).is_none());
    }

    #[test]
    fn test_guard_denies_with_fixed_response() {
        let checker: Arc<dyn PermissionChecker> = Arc::new(|_: &str| false);
        let guard = permission_guard("posts.write", Some(checker));

        let response = guard
            .call(&Request::new(Method::Post, "/posts"))
            .expect("guard should deny");
        assert_eq!(response.status, 401);
        assert_eq!(response.body_str(), ACCESS_DENIED_BODY);
    }

    #[test]
    fn test_guard_without_checker_denies() {
        let guard = permission_guard("posts.write", None);
        let response = guard.call(&Request::new(Method::Post, "/posts"));
        assert_eq!(response.map(|r| r.status), Some(401));
    }

    #[test]
    fn test_allow_all() {
        assert!(AllowAll.check("anything"));
    }
}
