//! # Call Site Identification
//!
//! A prefab's identity is anchored to the code that asked for it: the module
//! (mod) it came from, the declaring type and the method. Two mods cloning
//! different templates under the same display name therefore never collide.
//!
//! Callers normally hand an explicit [`CallSite`] to the registry, usually built
//! with the [`call_site!`](crate::call_site!) macro. Hosts that cannot do that
//! may fall back to [`CallSiteResolver`], which walks the stack. Symbol
//! information can be missing when frames are inlined or stripped, and the
//! resolver then fails instead of guessing.

use crate::error::{PrefabError, Result};
use backtrace::Backtrace;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identity of the module a prefab originates from, such as a mod's crate name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ModuleId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// The origin of a registration request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    type_qualifier: String,
    method_name: String,
    module: ModuleId,
}

impl CallSite {
    /// Builds a call site from explicit parts. All parts must be non-empty.
    pub fn new(
        module: impl Into<ModuleId>,
        type_qualifier: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Result<Self> {
        let site = Self {
            module: module.into(),
            type_qualifier: type_qualifier.into(),
            method_name: method_name.into(),
        };

        if site.module.as_str().trim().is_empty() {
            return Err(PrefabError::CallSiteUnresolved("origin module is empty".to_string()));
        }
        if site.type_qualifier.trim().is_empty() {
            return Err(PrefabError::CallSiteUnresolved("declaring type is empty".to_string()));
        }
        if site.method_name.trim().is_empty() {
            return Err(PrefabError::CallSiteUnresolved("method name is empty".to_string()));
        }
        Ok(site)
    }

    /// Builds a call site from a function path such as `my_mod::spawner::Spawner::spawn`.
    ///
    /// The last segment is the method, everything before it is the declaring
    /// type and the first segment is the module. Trailing closure segments and
    /// symbol hashes are dropped.
    pub fn from_function_path(path: &str) -> Result<Self> {
        let mut segments = split_path(path);
        while segments
            .last()
            .is_some_and(|segment| segment.starts_with('{') || is_symbol_hash(segment))
        {
            segments.pop();
        }

        let Some((method_name, type_segments)) = segments.split_last() else {
            return Err(PrefabError::CallSiteUnresolved(format!("empty function path {path:?}")));
        };
        if type_segments.is_empty() {
            return Err(PrefabError::CallSiteUnresolved(format!(
                "function path {path:?} has no declaring type"
            )));
        }

        let type_qualifier = type_segments.join("::");
        let module = module_of(&type_qualifier);
        Self::new(module, type_qualifier, *method_name)
    }

    /// Globally unique name of the declaring type, including its module.
    pub fn type_qualifier(&self) -> &str {
        &self.type_qualifier
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }
}

impl std::fmt::Display for CallSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{} [{}]", self.type_qualifier, self.method_name, self.module)
    }
}

/// Builds a [`CallSite`] for the enclosing function.
///
/// Expands to a `Result<CallSite, PrefabError>`. The module is the crate the
/// macro is invoked from.
///
/// ```
/// use prefab_registry::call_site;
///
/// fn spawn_mob() -> prefab_registry::CallSite {
///     call_site!().expect("function path always has a module")
/// }
///
/// assert_eq!(spawn_mob().method_name(), "spawn_mob");
/// ```
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __call_site_marker() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let path = __type_name_of(__call_site_marker);
        $crate::call_site::CallSite::from_function_path(
            path.strip_suffix("::__call_site_marker").unwrap_or(path),
        )
    }};
}

/// Stack-walking call site resolution.
pub struct CallSiteResolver;

impl CallSiteResolver {
    /// Resolves the caller `depth` frames above the first frame outside this crate.
    ///
    /// Depth 0 is the function that called into the registry.
    #[inline(never)]
    pub fn resolve(depth: usize) -> Result<CallSite> {
        let backtrace = Backtrace::new();
        let symbol = backtrace
            .frames()
            .iter()
            .flat_map(|frame| frame.symbols())
            .filter_map(|symbol| symbol.name().map(|name| format!("{name:#}")))
            .filter(|name| !is_internal_frame(name))
            .nth(depth)
            .ok_or_else(|| {
                PrefabError::CallSiteUnresolved(format!(
                    "no resolvable caller frame at depth {depth}; symbols may be stripped or inlined"
                ))
            })?;

        debug!("Resolved registration call site from symbol {}", symbol);
        CallSite::from_function_path(&symbol)
    }
}

const INTERNAL_PREFIXES: [&str; 5] = ["prefab_registry::", "backtrace::", "std::", "core::", "alloc::"];

const RUNTIME_TRAITS: [&str; 3] = [" as core::", " as std::", " as alloc::"];

/// Frames from this crate, the standard library, or a standard trait shim
/// such as `<user::f::{{closure}} as core::ops::FnOnce<()>>::call_once`.
fn is_internal_frame(name: &str) -> bool {
    let path = name.trim_start_matches('<');
    if INTERNAL_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return true;
    }
    name.starts_with('<') && RUNTIME_TRAITS.iter().any(|shim| name.contains(shim))
}

/// Splits a path on `::`, ignoring separators nested inside `<...>`.
fn split_path(path: &str) -> Vec<&str> {
    let bytes = path.as_bytes();
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                segments.push(&path[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    segments.push(&path[start..]);
    segments.retain(|segment| !segment.is_empty());
    segments
}

/// Matches the `h0123456789abcdef` suffix of legacy mangled symbols.
fn is_symbol_hash(segment: &str) -> bool {
    segment.len() == 17
        && segment.starts_with('h')
        && segment[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn module_of(type_qualifier: &str) -> String {
    type_qualifier
        .trim_start_matches('<')
        .split("::")
        .next()
        .unwrap_or(type_qualifier)
        .to_string()
}
