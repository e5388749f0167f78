//! # ssr-page
//!
//! Server-side rendering of a single-page application's document shell.
//!
//! A page is the app's markup for one route, wrapped in a fixed HTML shell,
//! followed by a `<script>` tag for every asset of the client build's
//! `main` entry point:
//!
//! ```text
//! <html>
//!   <body>
//!       <div id="app">{markup}</div>
//!       <script src="/static/main.js"></script>
//!   </body>
//! </html>
//! ```
//!
//! Markup comes from a [`MarkupRenderer`]. [`SandboxRenderer`] runs the
//! app's server bundle in a sandboxed V8 isolate (no fs, net or env access
//! beyond the bundle directory); [`RouteTable`] serves pre-rendered markup.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ssr_page::{render_page, ClientStats, RenderParams, SandboxConfig, SandboxRenderer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let stats = ClientStats::load("./dist/client/stats.json")?;
//!     let config = SandboxConfig {
//!         chunks_dir: "./dist/server".into(),
//!         ..Default::default()
//!     };
//!     let mut renderer = SandboxRenderer::new(&config, "./dist/server/render.js")?;
//!
//!     let html = render_page(&mut renderer, RenderParams::new("/", &stats)).await?;
//!     println!("{html}");
//!     Ok(())
//! }
//! ```

mod error;
mod loader;
mod manifest;
mod markup;
mod ops;
mod page;
mod runtime;

pub use error::PageError;
pub use loader::SandboxedLoader;
pub use manifest::{Asset, ClientStats, Entrypoint, MAIN_ENTRYPOINT};
pub use markup::{MarkupRenderer, RouteTable};
pub use ops::ConsoleOutput;
pub use page::{compose_document, render_page, RenderParams};
pub use runtime::{create_runtime, render_markup, MarkupResult, SandboxConfig, SandboxRenderer};
