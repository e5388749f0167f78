//! Page renderer - wraps route markup and client asset scripts in the
//! document shell.

use crate::error::PageError;
use crate::manifest::{Asset, ClientStats, MAIN_ENTRYPOINT};
use crate::markup::MarkupRenderer;
use std::borrow::Cow;

/// Inputs for one page render.
#[derive(Debug, Clone, Copy)]
pub struct RenderParams<'a> {
    pub route: &'a str,
    pub client_stats: &'a ClientStats,
    /// Entry point whose assets become script tags.
    pub entrypoint: &'a str,
}

impl<'a> RenderParams<'a> {
    pub fn new(route: &'a str, client_stats: &'a ClientStats) -> Self {
        Self {
            route,
            client_stats,
            entrypoint: MAIN_ENTRYPOINT,
        }
    }
}

/// Render the full document for `params.route`.
///
/// # Errors
/// - `PageError::MissingEntrypoint` if the stats lack the entry point
/// - `PageError::Markup` if the markup renderer fails; the cause is kept as
///   the error source
pub async fn render_page<R: MarkupRenderer>(
    renderer: &mut R,
    params: RenderParams<'_>,
) -> Result<String, PageError> {
    let assets = &params.client_stats.entrypoint(params.entrypoint)?.assets;

    let markup = renderer
        .render_markup(params.route)
        .await
        .map_err(|source| PageError::Markup {
            route: params.route.to_string(),
            source,
        })?;

    tracing::debug!(
        route = params.route,
        markup_bytes = markup.len(),
        scripts = assets.len(),
        "rendered page"
    );

    Ok(compose_document(&markup, assets))
}

/// The document shell around already-rendered markup.
///
/// Script tags are separated by newlines, never by commas.
pub fn compose_document(markup: &str, assets: &[Asset]) -> String {
    let scripts = assets
        .iter()
        .map(|asset| format!(r#"<script src="{}"></script>"#, escape_attr(asset.path())))
        .collect::<Vec<_>>()
        .join("\n        ");

    format!(
        r#"<html>
    <body>
        <div id="app">{markup}</div>
        {scripts}
    </body>
  </html>"#
    )
}

fn escape_attr(value: &str) -> Cow<'_, str> {
    const SPECIAL: [char; 5] = ['&', '<', '>', '"', '\''];
    if !value.contains(SPECIAL) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
