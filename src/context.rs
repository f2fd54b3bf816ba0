//! Run context.
//!
//! One [`Site`] is built at start-up and passed by reference through the
//! whole pipeline. It owns everything a stage may need besides its direct
//! inputs: the symbol table, the header/footer templates, the navigation
//! collected from the root manifest, the canonical URL, and the git
//! collaborator. Nothing in the crate keeps process-wide mutable state.
//!
//! Path resolution:
//!
//! ```text
//! directive paths (cf, md, cp, vb, gt, hi)  -> relative to the source directory
//! routes (ww, mv, as, rn)                   -> relative to the output directory
//! ```

use crate::config::{self, ConfigError, SiteConfig};
use crate::feed::FeedError;
use crate::fragment::PageFragment;
use crate::git::{GitError, GitMirror, SubprocessGit};
use crate::markdown;
use crate::materialize;
use crate::preview::{self, PreviewError};
use crate::symbols::{SymbolError, SymbolTable};
use crate::template::{self, NavEntry, Templates};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Symbols error: {0}")]
    Symbols(#[from] SymbolError),
    #[error("Git error: {0}")]
    Git(#[from] GitError),
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("Preview error: {0}")]
    Preview(#[from] PreviewError),
    #[error("invalid canonical url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error(
        "element {group} references listicle {listicle:?} before its output path is set (add `ww <route>` above it): {element}"
    )]
    ListicleBeforeRoute {
        group: usize,
        listicle: String,
        element: String,
    },
}

/// Everything the pipeline shares for one run.
pub struct Site {
    /// Directory all directive paths are resolved against.
    pub source: PathBuf,
    /// Output root.
    pub out: PathBuf,
    pub canonical_url: Option<Url>,
    pub generate_previews: bool,
    pub config: SiteConfig,
    pub symbols: SymbolTable,
    pub templates: Templates,
    /// Filled by the navigation pass, read by every page render.
    pub navigation: Vec<NavEntry>,
    git: Box<dyn GitMirror>,
}

impl Site {
    /// Build the context: load symbols and templates from `source` and
    /// parse the canonical URL.
    pub fn new(source: &Path, config: SiteConfig) -> Result<Self, BuildError> {
        let symbols = SymbolTable::load(&source.join(&config.files.symbols))?;
        let templates = Templates::load(source, &config.files.header, &config.files.footer)?;
        let canonical_url = config
            .url
            .as_deref()
            .map(parse_canonical_url)
            .transpose()?;
        Ok(Self {
            source: source.to_path_buf(),
            out: PathBuf::from(&config.out),
            canonical_url,
            generate_previews: config.generate_previews,
            git: Box::new(SubprocessGit::new(&config.git.remote)),
            config,
            symbols,
            templates,
            navigation: Vec::new(),
        })
    }

    /// Replace the git collaborator.
    pub fn with_git(mut self, git: Box<dyn GitMirror>) -> Self {
        self.git = git;
        self
    }

    pub fn git(&self) -> &dyn GitMirror {
        self.git.as_ref()
    }

    /// Resolve a directive path against the source directory.
    ///
    /// Absolute paths are kept; `~/` expands to `$HOME` when it is set.
    pub fn source_path(&self, path: &str) -> PathBuf {
        let path = path.trim();
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        self.source.join(path)
    }

    /// Resolve the source of a `cp`/`vb` command.
    ///
    /// Refuses (with a warning) anything that names or resolves to the
    /// filesystem root or the home directory.
    pub fn copy_source(&self, path: &str) -> Option<PathBuf> {
        if materialize::is_dangerous_copy_source(path) {
            log::warn!("refusing to copy {path:?}, that is unlikely to be intended");
            return None;
        }
        let resolved = self.source_path(path);
        let home = std::env::var_os("HOME").map(PathBuf::from);
        if materialize::is_protected_path(&resolved, home.as_deref()) {
            log::warn!(
                "refusing to copy {path:?} ({}), that is unlikely to be intended",
                resolved.display()
            );
            return None;
        }
        Some(resolved)
    }

    /// Output location of a route.
    pub fn out_path(&self, route: &str) -> PathBuf {
        materialize::out_path(&self.out, route)
    }

    /// Canonical URL without a trailing slash, e.g. `https://example.org`.
    pub fn canonical_base(&self) -> Option<String> {
        self.canonical_url
            .as_ref()
            .map(|u| u.as_str().trim_end_matches('/').to_string())
    }

    /// Host of the canonical URL, or an empty string.
    pub fn host(&self) -> String {
        self.canonical_url
            .as_ref()
            .and_then(|u| u.host_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Wrap `body` in the site chrome for `fragment`, with `back` as the
    /// navigation back-link.
    ///
    /// With previews enabled, titled pages also get open-graph tags and a
    /// preview image under `<out>/og/`.
    pub fn wrap(&self, fragment: &PageFragment, back: &str, body: &str) -> Result<String, BuildError> {
        let extra_meta = match fragment.title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) if self.generate_previews => self.preview_meta(fragment, title)?,
            _ => String::new(),
        };
        Ok(template::wrap_page(
            &self.templates,
            &self.navigation,
            fragment,
            back,
            &extra_meta,
            body,
        ))
    }

    fn preview_meta(&self, fragment: &PageFragment, title: &str) -> Result<String, BuildError> {
        let article = fragment
            .location
            .as_deref()
            .map(markdown::article_name)
            .unwrap_or_else(|| title.to_string());
        let slug = preview::preview_slug(&article);
        let subtitle = fragment.brief.as_deref().unwrap_or_default();
        let settings = preview::PreviewSettings::from(&self.config.preview);

        let image_path = self.out.join(preview::PREVIEW_DIR).join(format!("{slug}.png"));
        preview::generate_image(title, subtitle, &image_path, &settings)?;

        let image_url = format!(
            "{}/{}/{slug}.png",
            self.canonical_base().unwrap_or_default(),
            preview::PREVIEW_DIR
        );
        Ok(preview::metadata(title, subtitle, &image_url, &settings))
    }
}

/// Normalize and parse the configured canonical URL.
pub fn parse_canonical_url(raw: &str) -> Result<Url, BuildError> {
    let normalized = config::normalize_url(raw);
    Url::parse(&normalized).map_err(|source| BuildError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}
