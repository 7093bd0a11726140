//! Route table.

use http::Method;

use crate::error::{RouteError, RouteResult};
use crate::node::{parse_template, Node};
use crate::params::Params;

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route<T> {
    method: Method,
    template: String,
    value: T,
}

impl<T> Route<T> {
    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path template as registered (`/users/{id}`).
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Value stored for the route.
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    /// Matched route.
    pub route: &'a Route<T>,
    /// Variables captured from the path.
    pub params: Params,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Value stored for the matched route.
    pub fn value(&self) -> &'a T {
        &self.route.value
    }
}

/// Maps `(method, template)` pairs to values of type `T`.
///
/// Lookups prefer static segments over `{variables}`. Routes are enumerated in
/// registration order, which the documentation and tool generators rely on.
///
/// # Example
///
/// ```rust
/// use gapi_router::Router;
/// use http::Method;
///
/// let mut router = Router::new();
/// router.insert(Method::GET, "/users", "listUsers").unwrap();
/// router.insert(Method::GET, "/users/{id}", "getUser").unwrap();
///
/// let matched = router.at(&Method::GET, "/users/3").unwrap();
/// assert_eq!(*matched.value(), "getUser");
/// assert_eq!(matched.params.get("id"), Some("3"));
///
/// let err = router.at(&Method::DELETE, "/users").unwrap_err();
/// assert!(err.is_method_not_allowed());
/// ```
#[derive(Debug, Clone)]
pub struct Router<T> {
    root: Node,
    routes: Vec<Route<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            routes: Vec::new(),
        }
    }

    /// Registers `value` for `method` on `template`.
    pub fn insert(
        &mut self,
        method: Method,
        template: impl Into<String>,
        value: T,
    ) -> RouteResult<()> {
        let template = template.into();
        let segments = parse_template(&template)?;
        let index = self.routes.len();
        self.root.insert(&template, &segments, &method, index)?;
        self.routes.push(Route {
            method,
            template,
            value,
        });
        Ok(())
    }

    /// Looks up `path` for `method`.
    ///
    /// Fails with [`RouteError::NotFound`] when no template matches and with
    /// [`RouteError::MethodNotAllowed`] when one matches for other methods only.
    pub fn at(&self, method: &Method, path: &str) -> RouteResult<RouteMatch<'_, T>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let node = self
            .root
            .find(&segments, &mut params)
            .ok_or_else(|| RouteError::NotFound {
                path: path.to_string(),
            })?;

        match node.route_for(method) {
            Some(index) => Ok(RouteMatch {
                route: &self.routes[index],
                params,
            }),
            None => Err(RouteError::MethodNotAllowed {
                method: method.clone(),
                path: path.to_string(),
                allowed: node.methods(),
            }),
        }
    }

    /// Finds the route registered for exactly `method` and `template`.
    pub fn get(&self, method: &Method, template: &str) -> Option<&Route<T>> {
        self.routes
            .iter()
            .find(|r| r.method == *method && r.template == template)
    }

    /// All routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route<T>> {
        self.routes.iter()
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
