//! Module loader confined to the server bundle's directory.
//! Remote specifiers are refused, paths are canonicalized before the prefix
//! check, and only `.js`/`.mjs` files load.

use anyhow::{anyhow, Error};
use deno_core::{
    ModuleLoadResponse, ModuleLoader, ModuleSource, ModuleSourceCode, ModuleSpecifier,
    ModuleType, RequestedModuleType, ResolutionKind,
};
use std::path::{Path, PathBuf};

const REMOTE_SCHEMES: &[&str] = &["http://", "https://", "data:", "blob:"];

/// Resolves and loads modules from a single directory tree.
pub struct SandboxedLoader {
    allowed_dir: PathBuf,
}

impl SandboxedLoader {
    pub fn new(allowed_dir: impl AsRef<Path>) -> Result<Self, Error> {
        let allowed_dir = allowed_dir.as_ref();
        let canonical = allowed_dir.canonicalize().map_err(|e| {
            anyhow!("Failed to canonicalize chunks dir '{}': {}", allowed_dir.display(), e)
        })?;

        if !canonical.is_dir() {
            return Err(anyhow!("Chunks dir '{}' is not a directory", canonical.display()));
        }

        Ok(Self {
            allowed_dir: canonical,
        })
    }

    /// Symlinks and `..` are resolved before the prefix check; a path that
    /// doesn't exist is never allowed.
    fn check_path(&self, path: &Path) -> Result<(), Error> {
        let inside = path
            .canonicalize()
            .is_ok_and(|canonical| canonical.starts_with(&self.allowed_dir));
        if !inside {
            return Err(anyhow!(
                "Access denied: '{}' is outside the chunks dir",
                path.display()
            ));
        }

        let is_script = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("js" | "mjs")
        );
        if !is_script {
            return Err(anyhow!("Only .js and .mjs files allowed, got: {}", path.display()));
        }

        Ok(())
    }

    fn resolve_specifier(&self, specifier: &str, referrer: &str) -> Result<ModuleSpecifier, Error> {
        if specifier.starts_with("./") || specifier.starts_with("../") {
            let referrer_url = ModuleSpecifier::parse(referrer)
                .map_err(|e| anyhow!("Invalid referrer '{}': {}", referrer, e))?;
            return referrer_url
                .join(specifier)
                .map_err(|e| anyhow!("Failed to resolve '{}': {}", specifier, e));
        }

        if specifier.starts_with("file://") {
            return ModuleSpecifier::parse(specifier)
                .map_err(|e| anyhow!("Invalid file URL '{}': {}", specifier, e));
        }

        // Absolute paths as-is, bare names (chunk-abc123.js) from the dir root
        let path = if specifier.starts_with('/') {
            PathBuf::from(specifier)
        } else {
            self.allowed_dir.join(specifier)
        };
        ModuleSpecifier::from_file_path(&path)
            .map_err(|_| anyhow!("Invalid module path: {}", path.display()))
    }

    fn read_module(&self, specifier: &ModuleSpecifier) -> Result<ModuleSource, Error> {
        let path = specifier
            .to_file_path()
            .map_err(|_| anyhow!("Invalid file path: {}", specifier))?;
        self.check_path(&path)?;

        let code = std::fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read '{}': {}", path.display(), e))?;
        tracing::trace!(module = %specifier, bytes = code.len(), "loaded module");

        Ok(ModuleSource::new(
            ModuleType::JavaScript,
            ModuleSourceCode::String(code.into()),
            specifier,
            None,
        ))
    }
}

impl ModuleLoader for SandboxedLoader {
    fn resolve(
        &self,
        specifier: &str,
        referrer: &str,
        _kind: ResolutionKind,
    ) -> Result<ModuleSpecifier, Error> {
        if REMOTE_SCHEMES.iter().any(|scheme| specifier.starts_with(scheme)) {
            return Err(anyhow!("Remote imports are forbidden: {}", specifier));
        }

        let resolved = self.resolve_specifier(specifier, referrer)?;
        if resolved.scheme() != "file" {
            return Err(anyhow!("Only file:// URLs allowed, got: {}", resolved.scheme()));
        }

        let path = resolved
            .to_file_path()
            .map_err(|_| anyhow!("Failed to convert URL to path: {}", resolved))?;
        self.check_path(&path)?;

        Ok(resolved)
    }

    fn load(
        &self,
        module_specifier: &ModuleSpecifier,
        _maybe_referrer: Option<&ModuleSpecifier>,
        _is_dyn_import: bool,
        _requested_module_type: RequestedModuleType,
    ) -> ModuleLoadResponse {
        // Re-checked here: load can be reached without going through resolve
        ModuleLoadResponse::Sync(self.read_module(module_specifier))
    }
}
