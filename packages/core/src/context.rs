//! Context classification.
//!
//! Decides which execution context code is running in from environment
//! facts: the current location and the page the extension manifest declares
//! as its background page. The predicates are pure and are re-evaluated on
//! every call; nothing here caches.

use std::fmt;

use url::Url;

/// Scheme of extension-privileged pages.
pub const DEFAULT_EXTENSION_SCHEME: &str = "chrome-extension";

/// Path the host generates for the background page when the manifest lists
/// background scripts instead of a page.
pub const DEFAULT_GENERATED_OWNER_PATH: &str = "/_generated_background_page.html";

/// Configuration for context classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// The extension's privileged address scheme, without the trailing `:`.
    pub extension_scheme: String,

    /// Well-known path of the host-generated owner page.
    pub generated_owner_path: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            extension_scheme: DEFAULT_EXTENSION_SCHEME.to_string(),
            generated_owner_path: DEFAULT_GENERATED_OWNER_PATH.to_string(),
        }
    }
}

/// Address of the current execution environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub scheme: String,
    pub path: String,
}

impl Location {
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            path: path.into(),
        }
    }

    /// Parse a full address such as `chrome-extension://abc/options.html`.
    pub fn parse(address: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(address)?;
        Ok(Self::new(url.scheme(), url.path()))
    }
}

/// Which kind of context an environment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// The single long-lived context holding authoritative state.
    Owner,
    /// A plain web page, outside the extension's privileged scheme.
    Page,
    /// An extension page that is not the owner (options, popup, ...).
    Privileged,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKind::Owner => write!(f, "owner"),
            ContextKind::Page => write!(f, "page"),
            ContextKind::Privileged => write!(f, "privileged"),
        }
    }
}

/// Everything the classifier needs to know about an execution environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub config: ContextConfig,
    pub location: Location,
    /// Background page declared in the extension manifest, if any.
    pub manifest_owner_page: Option<String>,
}

impl Environment {
    /// Environment at `location` with the default configuration and no
    /// manifest-declared background page.
    pub fn new(location: Location) -> Self {
        Self {
            config: ContextConfig::default(),
            location,
            manifest_owner_page: None,
        }
    }

    pub fn with_config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_manifest_owner_page(mut self, page: impl Into<String>) -> Self {
        self.manifest_owner_page = Some(page.into());
        self
    }

    pub fn is_owner_context(&self) -> bool {
        is_owner_context(self)
    }

    pub fn is_page_context(&self) -> bool {
        is_page_context(self)
    }

    pub fn kind(&self) -> ContextKind {
        classify(self)
    }
}

/// Source of environment facts.
///
/// Implemented by host bridges; `Environment` implements it for a fixed
/// environment.
pub trait EnvironmentProbe: Send + Sync {
    fn environment(&self) -> Environment;
}

impl EnvironmentProbe for Environment {
    fn environment(&self) -> Environment {
        self.clone()
    }
}

fn scheme_matches(location: &Location, config: &ContextConfig) -> bool {
    location.scheme.trim_end_matches(':') == config.extension_scheme.trim_end_matches(':')
}

fn same_page(a: &str, b: &str) -> bool {
    a.trim_start_matches('/') == b.trim_start_matches('/')
}

/// True iff the environment is the extension's owner page.
pub fn is_owner_context(env: &Environment) -> bool {
    if !scheme_matches(&env.location, &env.config) {
        return false;
    }

    let path = &env.location.path;
    same_page(path, &env.config.generated_owner_path)
        || env
            .manifest_owner_page
            .as_deref()
            .is_some_and(|page| same_page(path, page))
}

/// True iff the environment is outside the extension's privileged scheme.
pub fn is_page_context(env: &Environment) -> bool {
    !scheme_matches(&env.location, &env.config)
}

/// Classify an environment. Privileged non-owner pages satisfy neither
/// predicate and land in `ContextKind::Privileged`.
pub fn classify(env: &Environment) -> ContextKind {
    if is_owner_context(env) {
        ContextKind::Owner
    } else if is_page_context(env) {
        ContextKind::Page
    } else {
        ContextKind::Privileged
    }
}
