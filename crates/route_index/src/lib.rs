//! Router-agnostic index of named routes.
//!
//! Keeping every route's name, template and handler together lets callers
//! build URLs by name (`index.url("expense", &["id", "42"])`) instead of
//! formatting paths by hand.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route named {0}")]
    UnknownRoute(String),
    #[error("parameters must come in name/value pairs, got {0} values")]
    OddParams(usize),
    #[error("parameter {param} not found in route {template}")]
    UnknownParam { param: String, template: String },
}

/// A route as registered with the web framework.
#[derive(Clone, Debug)]
pub struct RouteInfo<H> {
    pub name: String,
    /// Path template with `:param` placeholders, e.g. `/groups/:id`.
    pub template: String,
    pub handler: H,
}

impl<H> RouteInfo<H> {
    pub fn new(name: impl Into<String>, template: impl Into<String>, handler: H) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            handler,
        }
    }

    /// Names of the `:param` segments of the template, in order.
    pub fn template_names(&self) -> Vec<&str> {
        self.template
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct RouteIndex<H> {
    routes: HashMap<String, RouteInfo<H>>,
}

impl<H> RouteIndex<H> {
    /// Builds the index. A later route replaces an earlier one with the same
    /// name.
    pub fn new(routes: impl IntoIterator<Item = RouteInfo<H>>) -> Self {
        let routes = routes
            .into_iter()
            .map(|route| (route.name.clone(), route))
            .collect();
        Self { routes }
    }

    pub fn by_name(&self, name: &str) -> Result<&RouteInfo<H>, RouteError> {
        self.routes
            .get(name)
            .ok_or_else(|| RouteError::UnknownRoute(name.to_string()))
    }

    /// Like [`RouteIndex::by_name`] but panics on a missing route. Meant for
    /// wiring routes at start-up only.
    pub fn must_by_name(&self, name: &str) -> &RouteInfo<H> {
        match self.by_name(name) {
            Ok(route) => route,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fills the template of `name` with `pairs` of parameter name and value.
    ///
    /// Each pair replaces the first `:name` left in the path.
    pub fn url(&self, name: &str, pairs: &[&str]) -> Result<String, RouteError> {
        let route = self.by_name(name)?;
        if pairs.len() % 2 != 0 {
            return Err(RouteError::OddParams(pairs.len()));
        }

        let mut out = route.template.clone();
        for pair in pairs.chunks_exact(2) {
            let placeholder = format!(":{}", pair[0]);
            let Some(at) = out.find(&placeholder) else {
                return Err(RouteError::UnknownParam {
                    param: pair[0].to_string(),
                    template: route.template.clone(),
                });
            };
            out.replace_range(at..at + placeholder.len(), pair[1]);
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
