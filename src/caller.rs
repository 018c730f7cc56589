//! Caller attribution for hook dispatches
//!
//! Walks the local call stack (backtrace crate) and picks the first frame
//! that is not part of the recorder, the dispatcher, or the Rust runtime.
//! Attribution is best-effort: anything that goes wrong yields a blank
//! [`CallerInfo`], never an error.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum stack depth to walk (prevent runaway unwinding)
const MAX_STACK_DEPTH: usize = 128;

/// Symbol prefixes that never count as a caller: the resolver, the
/// recorder's wrappers, the bundled dispatcher, and the Rust runtime
pub const DEFAULT_IGNORED_PREFIXES: &[&str] = &[
    "backtrace::",
    "<backtrace::",
    "hookmon::caller::",
    "<hookmon::caller::",
    "hookmon::session::",
    "hookmon::interceptor::",
    "hookmon::registry::",
    "<hookmon::registry::",
    "core::",
    "<core::",
    "alloc::",
    "<alloc::",
    "std::",
    "<std::",
];

/// Who triggered a hook dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerInfo {
    pub function: String,
    /// Enclosing type when the call came from a method
    #[serde(rename = "class")]
    pub container: Option<String>,
    /// File basename only
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl CallerInfo {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.function.is_empty()
            && self.container.is_none()
            && self.file.is_none()
            && self.line.is_none()
    }

    /// Build from a demangled symbol name plus optional location
    pub fn from_symbol(symbol: &str, file: Option<&Path>, line: Option<u32>) -> Self {
        let (container, function) = split_symbol(symbol);
        Self {
            function,
            container,
            file: file.and_then(basename),
            line,
        }
    }
}

impl std::fmt::Display for CallerInfo {
    /// `Container::function in file (line N)`, omitting blank parts
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(container) = &self.container {
            write!(f, "{}::", container)?;
        }
        write!(f, "{}", self.function)?;
        if let Some(file) = &self.file {
            write!(f, " in {}", file)?;
        }
        if let Some(line) = self.line {
            write!(f, " (line {})", line)?;
        }
        Ok(())
    }
}

/// Capability for resolving the code that triggered a dispatch
pub trait CallerResolver {
    /// Skip `skip_frames` frames past the resolver's own, then return the
    /// first frame outside the ignored set. Blank when nothing is left.
    fn resolve(&self, skip_frames: usize) -> CallerInfo;
}

/// Resolver backed by the `backtrace` crate
#[derive(Debug, Clone)]
pub struct BacktraceResolver {
    max_depth: usize,
    ignored_prefixes: Vec<String>,
}

impl BacktraceResolver {
    pub fn new() -> Self {
        Self {
            max_depth: MAX_STACK_DEPTH,
            ignored_prefixes: DEFAULT_IGNORED_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Only look at the innermost `max_depth` frames
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Additional symbol prefixes to treat as dispatcher internals
    pub fn ignoring<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_prefixes
            .extend(prefixes.into_iter().map(Into::into));
        self
    }

    fn is_ignored(&self, symbol: &str) -> bool {
        self.ignored_prefixes
            .iter()
            .any(|prefix| symbol.starts_with(prefix.as_str()))
    }
}

impl Default for BacktraceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CallerResolver for BacktraceResolver {
    fn resolve(&self, skip_frames: usize) -> CallerInfo {
        let mut depth = 0;
        let mut seen_resolver = false;
        let mut own_frames_done = false;
        let mut to_skip = skip_frames;
        let mut found: Option<CallerInfo> = None;

        backtrace::trace(|frame| {
            if depth >= self.max_depth {
                return false;
            }
            depth += 1;

            // Inlined functions share a physical frame; innermost comes first
            let mut symbols = Vec::new();
            backtrace::resolve_frame(frame, |symbol| {
                if let Some(name) = symbol.name() {
                    symbols.push(SymbolFrame {
                        name: format!("{:#}", name),
                        file: symbol.filename().map(Path::to_path_buf),
                        line: symbol.lineno(),
                    });
                }
            });

            for symbol in symbols {
                // Everything up to and including the resolver itself
                if !own_frames_done {
                    if symbol.name.contains("BacktraceResolver") {
                        seen_resolver = true;
                        continue;
                    }
                    if !seen_resolver {
                        continue;
                    }
                    own_frames_done = true;
                }

                if to_skip > 0 {
                    to_skip -= 1;
                    continue;
                }

                if self.is_ignored(&symbol.name) {
                    continue;
                }

                found = Some(CallerInfo::from_symbol(
                    &symbol.name,
                    symbol.file.as_deref(),
                    symbol.line,
                ));
                return false;
            }
            true
        });

        found.unwrap_or_else(CallerInfo::blank)
    }
}

struct SymbolFrame {
    name: String,
    file: Option<std::path::PathBuf>,
    line: Option<u32>,
}

/// Resolver that never attributes anything (`--no-caller`)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl CallerResolver for NoopResolver {
    fn resolve(&self, _skip_frames: usize) -> CallerInfo {
        CallerInfo::blank()
    }
}

fn basename(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Split a demangled Rust path into (container, function)
///
/// - `app::Page::render` -> (`Page`, `render`)
/// - `<app::Page as app::Render>::render` -> (`Page`, `render`)
/// - `app::handlers::save` -> (None, `save`)
fn split_symbol(symbol: &str) -> (Option<String>, String) {
    let mut path = symbol.trim();
    while let Some(stripped) = path.strip_suffix("::{{closure}}") {
        path = stripped;
    }

    if let Some(rest) = path.strip_prefix('<') {
        if let Some(close) = rest.rfind(">::") {
            let self_ty = &rest[..close];
            let self_ty = self_ty.split(" as ").next().unwrap_or(self_ty);
            let function = &rest[close + 3..];
            let container = last_segment(strip_generics(self_ty));
            return (
                (!container.is_empty()).then(|| container.to_string()),
                function.to_string(),
            );
        }
    }

    let mut segments: Vec<&str> = path.split("::").collect();
    let function = segments.pop().unwrap_or_default().to_string();
    let container = segments
        .last()
        .filter(|seg| seg.starts_with(|c: char| c.is_ascii_uppercase()))
        .map(|seg| strip_generics(seg).to_string());
    (container, function)
}

fn strip_generics(ty: &str) -> &str {
    ty.split('<').next().unwrap_or(ty)
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
