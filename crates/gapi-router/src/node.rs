//! Segment tree used for template matching.
//!
//! Each node is one path segment. Nodes at the end of a template hold the
//! methods registered there, each pointing at an entry of the router's route
//! table.

use http::Method;

use crate::error::{RouteError, RouteResult};
use crate::params::Params;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Static(String),
    Param(String),
}

/// Splits a template into segments, validating `{name}` placeholders.
pub(crate) fn parse_template(template: &str) -> RouteResult<Vec<Segment>> {
    let invalid = |reason: &str| RouteError::InvalidTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    if !template.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }

    let mut names: Vec<&str> = Vec::new();
    let mut segments = Vec::new();
    for part in template.split('/').filter(|s| !s.is_empty()) {
        if let Some(name) = part.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            if name.is_empty() || name.contains(['{', '}', '/']) {
                return Err(invalid("empty or malformed variable"));
            }
            if names.contains(&name) {
                return Err(invalid("variable declared twice"));
            }
            names.push(name);
            segments.push(Segment::Param(name.to_string()));
        } else if part.contains(['{', '}']) {
            return Err(invalid("variables must span a whole segment"));
        } else {
            segments.push(Segment::Static(part.to_string()));
        }
    }
    Ok(segments)
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    segment: String,
    param_name: Option<String>,
    methods: Vec<(Method, usize)>,
    /// Sorted by segment for binary search.
    static_children: Vec<Node>,
    param_child: Option<Box<Node>>,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    fn new_static(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            ..Self::default()
        }
    }

    fn new_param(name: &str) -> Self {
        Self {
            segment: format!("{{{name}}}"),
            param_name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Registers `index` for `method` at the end of `segments`.
    ///
    /// Two templates sharing a prefix must name their variables identically.
    pub(crate) fn insert(
        &mut self,
        template: &str,
        segments: &[Segment],
        method: &Method,
        index: usize,
    ) -> RouteResult<()> {
        let Some((first, rest)) = segments.split_first() else {
            if self.methods.iter().any(|(m, _)| m == method) {
                return Err(RouteError::Duplicate {
                    method: method.clone(),
                    template: template.to_string(),
                });
            }
            self.methods.push((method.clone(), index));
            return Ok(());
        };

        match first {
            Segment::Static(segment) => {
                let position = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(segment))
                {
                    Ok(position) => position,
                    Err(position) => {
                        self.static_children
                            .insert(position, Self::new_static(segment));
                        position
                    }
                };
                self.static_children[position].insert(template, rest, method, index)
            }
            Segment::Param(name) => {
                let child = self
                    .param_child
                    .get_or_insert_with(|| Box::new(Self::new_param(name)));
                if child.param_name.as_deref() != Some(name.as_str()) {
                    return Err(RouteError::InvalidTemplate {
                        template: template.to_string(),
                        reason: format!(
                            "variable {{{name}}} conflicts with existing {}",
                            child.segment
                        ),
                    });
                }
                child.insert(template, rest, method, index)
            }
        }
    }

    /// Finds the node for `path`, filling `params` along the way.
    ///
    /// Static segments win over variables; on a dead end the variable branch
    /// is tried and its captures rolled back if it also fails.
    pub(crate) fn find<'a>(&'a self, segments: &[&str], params: &mut Params) -> Option<&'a Self> {
        let Some((first, rest)) = segments.split_first() else {
            return (!self.methods.is_empty()).then_some(self);
        };

        if let Ok(i) = self
            .static_children
            .binary_search_by(|c| c.segment.as_str().cmp(first))
        {
            if let Some(found) = self.static_children[i].find(rest, params) {
                return Some(found);
            }
        }

        let child = self.param_child.as_deref()?;
        let name = child.param_name.as_deref()?;
        let mark = params.len();
        params.push(name, *first);
        let found = child.find(rest, params);
        if found.is_none() {
            params.truncate(mark);
        }
        found
    }

    pub(crate) fn route_for(&self, method: &Method) -> Option<usize> {
        self.methods
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, index)| *index)
    }

    pub(crate) fn methods(&self) -> Vec<Method> {
        self.methods.iter().map(|(m, _)| m.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(path: &str) -> Vec<&str> {
        path.split('/').filter(|s| !s.is_empty()).collect()
    }

    #[test]
    fn test_parse_template() {
        let parsed = parse_template("/users/{id}/posts").unwrap();
        assert_eq!(
            parsed,
            vec![
                Segment::Static("users".into()),
                Segment::Param("id".into()),
                Segment::Static("posts".into()),
            ]
        );
        assert!(parse_template("/").unwrap().is_empty());
    }

    #[test]
    fn test_parse_template_rejects_malformed() {
        assert!(parse_template("users").is_err());
        assert!(parse_template("/users/{}").is_err());
        assert!(parse_template("/users/id-{id}").is_err());
        assert!(parse_template("/a/{id}/b/{id}").is_err());
    }

    #[test]
    fn test_backtracking_rolls_back_captures() {
        let mut root = Node::root();
        root.insert("/{a}/x", &parse_template("/{a}/x").unwrap(), &Method::GET, 0)
            .unwrap();
        root.insert("/b/y", &parse_template("/b/y").unwrap(), &Method::GET, 1)
            .unwrap();

        let mut params = Params::new();
        let node = root.find(&segments("/b/x"), &mut params).unwrap();
        assert_eq!(node.route_for(&Method::GET), Some(0));
        assert_eq!(params.get("a"), Some("b"));

        let mut params = Params::new();
        assert!(root.find(&segments("/c/z"), &mut params).is_none());
        assert!(params.is_empty());
    }

    #[test]
    fn test_conflicting_variable_names() {
        let mut root = Node::root();
        root.insert("/u/{id}", &parse_template("/u/{id}").unwrap(), &Method::GET, 0)
            .unwrap();
        let err = root
            .insert("/u/{uid}/x", &parse_template("/u/{uid}/x").unwrap(), &Method::GET, 1)
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidTemplate { .. }));
    }
}
