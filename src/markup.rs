//! The markup renderer capability: route in, application markup out.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Converts the application's component tree into markup for a request path.
///
/// Implementations decide what an unmatched route looks like; the page
/// renderer never special-cases it.
#[allow(async_fn_in_trait)]
pub trait MarkupRenderer {
    async fn render_markup(&mut self, route: &str) -> Result<String>;
}

/// Pre-rendered markup keyed by exact route path.
///
/// ```json
/// { "routes": { "/": "<div>Home</div>" }, "not_found": "<div>Not found</div>" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteTable {
    #[serde(default)]
    pub routes: HashMap<String, String>,
    /// Markup for routes not in the table. Without it they render empty.
    #[serde(default)]
    pub not_found: Option<String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: impl Into<String>, markup: impl Into<String>) -> Self {
        self.routes.insert(path.into(), markup.into());
        self
    }

    pub fn not_found(mut self, markup: impl Into<String>) -> Self {
        self.not_found = Some(markup.into());
        self
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read route table '{}': {}", path.display(), e))?;
        serde_json::from_str(&json)
            .map_err(|e| anyhow!("Invalid route table '{}': {}", path.display(), e))
    }

    pub fn lookup(&self, route: &str) -> &str {
        self.routes
            .get(route)
            .or(self.not_found.as_ref())
            .map_or("", String::as_str)
    }
}

impl MarkupRenderer for RouteTable {
    async fn render_markup(&mut self, route: &str) -> Result<String> {
        Ok(self.lookup(route).to_string())
    }
}
