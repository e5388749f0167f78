//! Ops exposed to the sandboxed runtime.
//!
//! Console calls from the bundle land here instead of on stdout, which is
//! reserved for rendered documents.

use deno_core::{op2, OpState};

/// Console output captured during one render
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsoleOutput {
    pub logs: Vec<String>,
    pub warns: Vec<String>,
    pub errors: Vec<String>,
}

impl ConsoleOutput {
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty() && self.warns.is_empty() && self.errors.is_empty()
    }

    /// Forward captured lines to the tracing subscriber.
    pub fn emit(&self, route: &str) {
        for line in &self.logs {
            tracing::info!(route, "console: {}", line);
        }
        for line in &self.warns {
            tracing::warn!(route, "console: {}", line);
        }
        for line in &self.errors {
            tracing::error!(route, "console: {}", line);
        }
    }
}

#[op2(fast)]
pub fn op_console_log(state: &mut OpState, #[string] msg: &str) {
    if let Some(output) = state.try_borrow_mut::<ConsoleOutput>() {
        output.logs.push(msg.to_string());
    }
}

#[op2(fast)]
pub fn op_console_warn(state: &mut OpState, #[string] msg: &str) {
    if let Some(output) = state.try_borrow_mut::<ConsoleOutput>() {
        output.warns.push(msg.to_string());
    }
}

#[op2(fast)]
pub fn op_console_error(state: &mut OpState, #[string] msg: &str) {
    if let Some(output) = state.try_borrow_mut::<ConsoleOutput>() {
        output.errors.push(msg.to_string());
    }
}

deno_core::extension!(
    ssr_page,
    ops = [op_console_log, op_console_warn, op_console_error],
    esm_entry_point = "ext:ssr_page/bootstrap.js",
    esm = ["ext:ssr_page/bootstrap.js" = "src/bootstrap.js"],
);
