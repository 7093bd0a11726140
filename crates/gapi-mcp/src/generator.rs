//! Turning documented routes into tools.

use std::collections::HashMap;

use gapi_docs::DocBuilder;
use gapi_middleware::Endpoint;
use gapi_router::Router;
use http::Method;
use tracing::{error, warn};

use crate::error::{McpError, McpResult};
use crate::executor::ToolRoute;
use crate::protocol::Tool;
use crate::schema::FlatSchema;

/// Tool name for an operation.
///
/// `lower(method) + "_" + operation_id`, or a name derived from the path
/// when the operation ID is empty.
///
/// ```
/// use gapi_mcp::tool_name;
/// use http::Method;
///
/// assert_eq!(tool_name(&Method::GET, "getUsersId", "/users/{id}"), "get_getUsersId");
/// assert_eq!(tool_name(&Method::POST, "", "/users/{id}/roles"), "post_users_id_roles");
/// ```
pub fn tool_name(method: &Method, operation_id: &str, path: &str) -> String {
    let method = method.as_str().to_ascii_lowercase();
    if !operation_id.is_empty() {
        return format!("{method}_{operation_id}");
    }

    let stem = path.replace(['{', '}'], "").replace('/', "_");
    format!("{method}_{}", stem.trim_matches('_'))
}

/// Tool description: summary and description joined by `" - "` when both
/// are present, else whichever exists.
///
/// The separator is a plain ASCII hyphen rather than an em dash.
pub fn tool_description(summary: Option<&str>, description: Option<&str>) -> String {
    let parts: Vec<&str> = [summary, description]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect();
    parts.join(" - ")
}

/// Builds the tool for one documented operation.
///
/// Returns `None` when the operation opted out of tool exposure.
///
/// # Errors
///
/// Fails when its arguments collide.
pub fn generate_tool(
    builder: &DocBuilder,
    endpoint: &Endpoint,
) -> McpResult<Option<(Tool, ToolRoute)>> {
    if !builder.is_tool_enabled() {
        return Ok(None);
    }

    let name = match builder.tool_name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => tool_name(builder.method(), builder.operation_id(), builder.path()),
    };
    let (input_schema, origins) = FlatSchema::build(builder.params(), builder.body())?.into_parts();

    let tool = Tool {
        name,
        description: tool_description(builder.summary(), builder.description()),
        input_schema,
    };
    let route = ToolRoute::new(
        builder.method().clone(),
        builder.path(),
        endpoint.clone(),
        origins,
    );
    Ok(Some((tool, route)))
}

/// Every tool of an application, in route registration order.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: Vec<Tool>,
    routes: HashMap<String, ToolRoute>,
}

impl ToolSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates tools for every route whose template is not in `ignored`.
    ///
    /// Operations that fail to describe themselves, declare colliding
    /// arguments, or reuse a tool name are logged and left out.
    pub fn from_router(router: &Router<Endpoint>, ignored: &[String]) -> Self {
        let mut set = Self::new();

        for route in router.routes() {
            if ignored.iter().any(|p| p == route.template()) {
                continue;
            }

            let mut builder = DocBuilder::new(route.method().clone(), route.template());
            if let Err(err) = route.value().document(&mut builder) {
                warn!(
                    http.method = %route.method(),
                    http.path = %route.template(),
                    error = %err,
                    "skipping tool: operation failed to describe itself"
                );
                continue;
            }

            let added = match generate_tool(&builder, route.value()) {
                Ok(Some((tool, tool_route))) => set.insert(tool, tool_route),
                Ok(None) => Ok(()),
                Err(err) => Err(err),
            };
            if let Err(err) = added {
                error!(
                    http.method = %route.method(),
                    http.path = %route.template(),
                    error = %err,
                    "skipping tool"
                );
            }
        }

        set
    }

    /// Adds a tool.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::DuplicateTool`] when the name is taken.
    pub fn insert(&mut self, tool: Tool, route: ToolRoute) -> McpResult<()> {
        if let Some(existing) = self.routes.get(&tool.name) {
            return Err(McpError::DuplicateTool {
                name: tool.name,
                existing: format!("{} {}", existing.method(), existing.template()),
            });
        }
        self.routes.insert(tool.name.clone(), route);
        self.tools.push(tool);
        Ok(())
    }

    /// Tools, as listed by `tools/list`.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Route behind a tool.
    pub fn route(&self, name: &str) -> Option<&ToolRoute> {
        self.routes.get(name)
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapi_core::Reply;
    use gapi_extract::{Field, ParamSource};
    use gapi_middleware::FnHandler;

    fn endpoint_with_doc<D>(doc: D) -> Endpoint
    where
        D: Fn(&mut DocBuilder) -> gapi_docs::DocsResult<()> + Clone + Send + Sync + 'static,
    {
        Endpoint::new(move || {
            FnHandler::new(|_ctx, _req| Box::pin(async { Ok(Reply::Empty) })).with_doc(doc.clone())
        })
    }

    #[test]
    fn test_tool_name_from_operation_id() {
        assert_eq!(
            tool_name(&Method::GET, &gapi_docs::operation_id(&Method::GET, "/users/{id}"), "/users/{id}"),
            "get_getUsersId"
        );
        assert_eq!(
            tool_name(
                &Method::DELETE,
                &gapi_docs::operation_id(&Method::DELETE, "/orgs/{org}/members/{id}"),
                "/orgs/{org}/members/{id}"
            ),
            "delete_deleteOrgsOrgMembersId"
        );
    }

    #[test]
    fn test_tool_name_fallback() {
        assert_eq!(tool_name(&Method::GET, "", "/"), "get_");
        assert_eq!(tool_name(&Method::PATCH, "", "/users/{id}"), "patch_users_id");
    }

    #[test]
    fn test_tool_description() {
        assert_eq!(tool_description(Some("Get user"), Some("By id")), "Get user - By id");
        assert_eq!(tool_description(None, Some("By id")), "By id");
        assert_eq!(tool_description(Some("Get user"), Some("")), "Get user");
        assert_eq!(tool_description(None, None), "");
    }

    #[test]
    fn test_from_router_honours_overrides_and_opt_out() {
        let mut router = Router::new();
        router
            .insert(
                Method::GET,
                "/users/{id}",
                endpoint_with_doc(|b| {
                    b.with_summary("Get user")
                        .with_params(ParamSource::Path, vec![Field::integer("id")]);
                    Ok(())
                }),
            )
            .unwrap();
        router
            .insert(
                Method::POST,
                "/users",
                endpoint_with_doc(|b| {
                    b.with_tool_name("create_user");
                    Ok(())
                }),
            )
            .unwrap();
        router
            .insert(
                Method::GET,
                "/internal",
                endpoint_with_doc(|b| {
                    b.with_tool(false);
                    Ok(())
                }),
            )
            .unwrap();
        router
            .insert(Method::GET, "/openapi.json", endpoint_with_doc(|_| Ok(())))
            .unwrap();

        let set = ToolSet::from_router(&router, &["/openapi.json".to_string()]);
        let names: Vec<&str> = set.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["get_getUsersId", "create_user"]);
        assert_eq!(set.tools()[0].description, "Get user");
        assert_eq!(set.route("get_getUsersId").unwrap().template(), "/users/{id}");
    }

    #[test]
    fn test_from_router_skips_failing_and_colliding_operations() {
        let mut router = Router::new();
        router
            .insert(
                Method::GET,
                "/broken",
                endpoint_with_doc(|_| Err(gapi_docs::DocsError::describe("no docs"))),
            )
            .unwrap();
        router
            .insert(
                Method::PUT,
                "/users/{id}",
                endpoint_with_doc(|b| {
                    b.with_params(ParamSource::Path, vec![Field::integer("id")])
                        .with_body(vec![Field::integer("id")], gapi_docs::BodyOptions::new());
                    Ok(())
                }),
            )
            .unwrap();
        router
            .insert(Method::GET, "/ok", endpoint_with_doc(|_| Ok(())))
            .unwrap();

        let set = ToolSet::from_router(&router, &[]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.tools()[0].name, "get_getOk");
    }

    #[test]
    fn test_duplicate_tool_name_is_rejected() {
        let mut router = Router::new();
        for path in ["/a", "/b"] {
            router
                .insert(
                    Method::GET,
                    path,
                    endpoint_with_doc(|b| {
                        b.with_tool_name("same");
                        Ok(())
                    }),
                )
                .unwrap();
        }

        let set = ToolSet::from_router(&router, &[]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.route("same").unwrap().template(), "/a");
    }
}
