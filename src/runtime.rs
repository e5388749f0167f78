//! Sandboxed JavaScript markup renderer.
//!
//! Runs the application's server bundle in a V8 isolate with nothing but
//! module loading from one directory and a captured console. The bundle's
//! entry module exports the function that renders the app under a static
//! router for a location:
//!
//! ```js
//! export function render(route) {
//!   return renderToString(<StaticRouter location={route}><App /></StaticRouter>);
//! }
//! ```
//!
//! A default export works too, and the function may return a promise.

use crate::loader::SandboxedLoader;
use crate::markup::MarkupRenderer;
use crate::ops::{ssr_page, ConsoleOutput};
use anyhow::{anyhow, Error};
use deno_core::{JsRuntime, ModuleSpecifier, PollEventLoopOptions, RuntimeOptions};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of rendering one route
#[derive(Debug)]
pub struct MarkupResult {
    pub markup: String,
    pub console: ConsoleOutput,
}

/// Configuration for the sandbox
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Directory containing the server bundle (only this dir is accessible)
    pub chunks_dir: PathBuf,
    /// Maximum heap size in bytes (default: 64MB, None = unlimited)
    pub max_heap_size: Option<usize>,
    /// Maximum time for a single render in milliseconds (default: 30000ms, None = unlimited)
    pub timeout_ms: Option<u64>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            chunks_dir: PathBuf::from("./chunks"),
            max_heap_size: Some(64 * 1024 * 1024),
            timeout_ms: Some(30_000),
        }
    }
}

/// Create a sandboxed JS runtime
pub fn create_runtime(config: &SandboxConfig) -> Result<JsRuntime, Error> {
    let loader = SandboxedLoader::new(&config.chunks_dir)?;

    let create_params = config
        .max_heap_size
        .map(|max_bytes| deno_core::v8::Isolate::create_params().heap_limits(0, max_bytes));

    let mut runtime = JsRuntime::new(RuntimeOptions {
        module_loader: Some(Rc::new(loader)),
        extensions: vec![ssr_page::init_ops_and_esm()],
        create_params,
        ..Default::default()
    });

    if config.max_heap_size.is_some() {
        // Returning the current limit makes V8 fail the render instead of growing
        runtime.add_near_heap_limit_callback(|current, initial| {
            tracing::warn!(
                current_mb = current / (1024 * 1024),
                initial_mb = initial / (1024 * 1024),
                "sandbox near heap limit"
            );
            current
        });
    }

    runtime.op_state().borrow_mut().put(ConsoleOutput::default());

    Ok(runtime)
}

/// Render the markup for `route` with the bundle's entry module.
///
/// `entry_point` must be inside the sandbox's chunks directory. Console
/// output is collected fresh for every call.
///
/// The timeout timer is a spawned task, so a render that spins synchronously
/// is only interrupted on a multi-thread tokio runtime.
pub async fn render_markup(
    runtime: &mut JsRuntime,
    entry_point: &Path,
    route: &str,
    timeout_ms: Option<u64>,
) -> Result<MarkupResult, Error> {
    runtime.op_state().borrow_mut().put(ConsoleOutput::default());

    let Some(ms) = timeout_ms else {
        return render_markup_inner(runtime, entry_point, route).await;
    };

    let timed_out = Arc::new(AtomicBool::new(false));
    let isolate_handle = runtime.v8_isolate().thread_safe_handle();
    let timeout_handle = tokio::spawn({
        let timed_out = Arc::clone(&timed_out);
        async move {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
            timed_out.store(true, Ordering::SeqCst);
            isolate_handle.terminate_execution();
        }
    });

    let result = render_markup_inner(runtime, entry_point, route).await;

    // Wait for the timer to be gone so it can't terminate a later render
    timeout_handle.abort();
    let _ = timeout_handle.await;

    if !timed_out.load(Ordering::SeqCst) {
        return result;
    }

    // The timer fired: clear the pending termination whatever the outcome
    runtime.v8_isolate().cancel_terminate_execution();
    match result {
        Ok(markup) => Ok(markup),
        Err(_) => Err(anyhow!("Render timed out after {}ms", ms)),
    }
}

async fn render_markup_inner(
    runtime: &mut JsRuntime,
    entry_point: &Path,
    route: &str,
) -> Result<MarkupResult, Error> {
    let entry_path = entry_point
        .canonicalize()
        .map_err(|e| anyhow!("Invalid entry point '{}': {}", entry_point.display(), e))?;

    let module_specifier = ModuleSpecifier::from_file_path(&entry_path)
        .map_err(|_| anyhow!("Failed to create module specifier"))?;

    let render_code = format!(
        "globalThis.__ssr_page_render__({}, {})",
        serde_json::to_string(module_specifier.as_str())?,
        serde_json::to_string(route)?
    );

    let markup_global = runtime.execute_script("<ssr-page>", render_code)?;

    runtime
        .run_event_loop(PollEventLoopOptions::default())
        .await?;

    let markup = {
        let scope = &mut runtime.handle_scope();
        let local = deno_core::v8::Local::new(scope, &markup_global);

        if let Ok(promise) = deno_core::v8::Local::<deno_core::v8::Promise>::try_from(local) {
            match promise.state() {
                deno_core::v8::PromiseState::Fulfilled => {
                    let result = promise.result(scope);
                    if !result.is_string() {
                        return Err(anyhow!("Render function must return a string"));
                    }
                    result.to_rust_string_lossy(scope)
                }
                deno_core::v8::PromiseState::Rejected => {
                    let exception = promise.result(scope);
                    return Err(anyhow!(
                        "Render function threw: {}",
                        exception.to_rust_string_lossy(scope)
                    ));
                }
                deno_core::v8::PromiseState::Pending => {
                    return Err(anyhow!("Render function returned unresolved promise"));
                }
            }
        } else if local.is_string() {
            local.to_rust_string_lossy(scope)
        } else {
            return Err(anyhow!("Render function must return a string"));
        }
    };

    let console = runtime.op_state().borrow().borrow::<ConsoleOutput>().clone();

    Ok(MarkupResult { markup, console })
}

/// A `MarkupRenderer` backed by a server bundle in the sandbox.
pub struct SandboxRenderer {
    runtime: JsRuntime,
    entry_point: PathBuf,
    timeout_ms: Option<u64>,
}

impl SandboxRenderer {
    pub fn new(config: &SandboxConfig, entry_point: impl Into<PathBuf>) -> Result<Self, Error> {
        Ok(Self {
            runtime: create_runtime(config)?,
            entry_point: entry_point.into(),
            timeout_ms: config.timeout_ms,
        })
    }
}

impl MarkupRenderer for SandboxRenderer {
    async fn render_markup(&mut self, route: &str) -> anyhow::Result<String> {
        let result =
            render_markup(&mut self.runtime, &self.entry_point, route, self.timeout_ms).await?;
        result.console.emit(route);
        Ok(result.markup)
    }
}
