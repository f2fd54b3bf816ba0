//! Directive codes and the commands they stand for.
//!
//! Every line of a directive file starts with a short code (`tt`, `md`, ...).
//! The pipeline never looks at those codes directly: it asks a
//! [`SymbolTable`] to resolve them into a [`CommandKind`]. The table starts
//! from the stock mapping embedded in the binary and is overlaid with the
//! user's `symbols` file, so codes can be renamed without touching the code.
//!
//! ## Mapping File
//!
//! ```text
//! tt TITLE
//! bb BRIEF
//! // SKIP
//! ```
//!
//! One `code KIND` pair per line. Blank lines are ignored. A kind name the
//! table does not know maps the code to [`CommandKind::Unknown`].

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_SYMBOLS: &str = include_str!("../static/default-symbols");

#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("symbols line {line}: expected `<code> <KIND>`, got {content:?}")]
    Malformed { line: usize, content: String },
}

/// Semantic command behind a directive code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Title,
    Brief,
    Link,
    /// Comment lines and blank lines.
    Skip,
    NavigationTitle,
    ListicleSource,
    MarkdownSource,
    Verbatim,
    OutputPath,
    CopyDir,
    Redirect,
    Alias,
    Rename,
    UnderCategory,
    CreateRss,
    Background,
    ForegroundColor,
    BackgroundColor,
    HeaderImage,
    LinkColor,
    GitRepo,
    GitBranch,
    /// A code with no mapping. Kept as a pair, ignored by every handler.
    Unknown,
}

impl CommandKind {
    /// Name used in the mapping file.
    pub fn name(self) -> &'static str {
        match self {
            Self::Title => "TITLE",
            Self::Brief => "BRIEF",
            Self::Link => "LINK",
            Self::Skip => "SKIP",
            Self::NavigationTitle => "NAVIGATION_TITLE",
            Self::ListicleSource => "LISTICLE_SOURCE",
            Self::MarkdownSource => "MARKDOWN_SOURCE",
            Self::Verbatim => "VERBATIM",
            Self::OutputPath => "OUTPUT_PATH",
            Self::CopyDir => "COPY_DIR",
            Self::Redirect => "REDIRECT",
            Self::Alias => "ALIAS",
            Self::Rename => "RENAME",
            Self::UnderCategory => "UNDER_CATEGORY",
            Self::CreateRss => "CREATE_RSS",
            Self::Background => "BACKGROUND",
            Self::ForegroundColor => "FOREGROUND_COLOR",
            Self::BackgroundColor => "BACKGROUND_COLOR",
            Self::HeaderImage => "HEADER_IMAGE",
            Self::LinkColor => "LINK_COLOR",
            Self::GitRepo => "GIT_REPO",
            Self::GitBranch => "GIT_BRANCH",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for CommandKind {
    type Err = std::convert::Infallible;

    /// Never fails: unrecognized names become [`CommandKind::Unknown`].
    ///
    /// `PATH_SSG`, `PATH_MD` and `PATH_WWWROOT` are accepted as older
    /// spellings of the listicle, markdown and output-path kinds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "TITLE" => Self::Title,
            "BRIEF" => Self::Brief,
            "LINK" => Self::Link,
            "SKIP" => Self::Skip,
            "NAVIGATION_TITLE" => Self::NavigationTitle,
            "LISTICLE_SOURCE" | "PATH_SSG" => Self::ListicleSource,
            "MARKDOWN_SOURCE" | "PATH_MD" => Self::MarkdownSource,
            "VERBATIM" => Self::Verbatim,
            "OUTPUT_PATH" | "PATH_WWWROOT" => Self::OutputPath,
            "COPY_DIR" => Self::CopyDir,
            "REDIRECT" => Self::Redirect,
            "ALIAS" => Self::Alias,
            "RENAME" => Self::Rename,
            "UNDER_CATEGORY" => Self::UnderCategory,
            "CREATE_RSS" => Self::CreateRss,
            "BACKGROUND" => Self::Background,
            "FOREGROUND_COLOR" => Self::ForegroundColor,
            "BACKGROUND_COLOR" => Self::BackgroundColor,
            "HEADER_IMAGE" => Self::HeaderImage,
            "LINK_COLOR" => Self::LinkColor,
            "GIT_REPO" => Self::GitRepo,
            "GIT_BRANCH" => Self::GitBranch,
            _ => Self::Unknown,
        })
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Code → kind lookup, built once per run.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    codes: HashMap<String, CommandKind>,
}

impl Default for SymbolTable {
    /// The stock mapping shipped with the binary.
    fn default() -> Self {
        let mut table = Self {
            codes: HashMap::new(),
        };
        // The embedded file is covered by `stock_mapping_parses`.
        let _ = table.extend_from_str(DEFAULT_SYMBOLS);
        table
    }
}

impl SymbolTable {
    /// Stock mapping overlaid with the mapping file at `path`, if it exists.
    pub fn load(path: &Path) -> Result<Self, SymbolError> {
        let mut table = Self::default();
        if path.exists() {
            let content = fs::read_to_string(path)?;
            table.extend_from_str(&content)?;
        }
        Ok(table)
    }

    /// Parse `code KIND` lines, overriding existing codes.
    pub fn extend_from_str(&mut self, content: &str) -> Result<(), SymbolError> {
        for (idx, line) in content.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(code) = fields.next() else {
                continue;
            };
            let Some(kind) = fields.next() else {
                return Err(SymbolError::Malformed {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let kind = kind.parse().unwrap_or(CommandKind::Unknown);
            self.codes.insert(code.to_string(), kind);
        }
        Ok(())
    }

    /// Resolve a bare code.
    pub fn kind(&self, code: &str) -> CommandKind {
        self.codes
            .get(code)
            .copied()
            .unwrap_or(CommandKind::Unknown)
    }

    /// Resolve a whole directive line by its first token.
    ///
    /// Empty and whitespace-only lines are [`CommandKind::Skip`].
    pub fn resolve(&self, line: &str) -> CommandKind {
        match line.split_whitespace().next() {
            Some(code) => self.kind(code),
            None => CommandKind::Skip,
        }
    }
}

/// The embedded stock mapping, written out by the scaffold.
pub fn stock_mapping() -> &'static str {
    DEFAULT_SYMBOLS
}
