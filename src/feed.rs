//! RSS feeds.
//!
//! Every `cc <description>` in the root manifest turns the listicle named by
//! the element's `cf` into `<out>/<listicle>.xml`. All items of all feeds
//! are also combined, newest first, into `<out>/all.xml`.
//!
//! ## Item store
//!
//! Items are rendered once. The rendered `<item>` and its publish time are
//! kept in a JSON store in the source directory (`rss-store.json`):
//!
//! ```json
//! {
//!   "projects/plainweb": {
//!     "renderedXML": "<item>\n  <title>plainweb</title>\n ...</item>",
//!     "publishTimestampUnix": 1700000000
//!   }
//! }
//! ```
//!
//! Ids are `<listicle>/<title>`. An id found in the store is reused
//! verbatim, so rebuilding never changes a published item's `pubDate`;
//! only ids seen for the first time are rendered with the current time.
//! The store is rewritten wholesale at the end of the feed pass.

use crate::context::{BuildError, Site};
use crate::directive;
use crate::markdown;
use crate::symbols::CommandKind;
use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Name of the feed combining every other feed.
pub const ALL_FEED: &str = "all";

const RFC822: &str = "%a, %d %b %Y %H:%M:%S %z";

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("feed store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A feed requested with `cc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDescription {
    /// Listicle file the feed is built from; also the feed's file name.
    pub name: String,
    pub description: String,
    /// Listicle pages live under the parent route (`un`).
    pub nested: bool,
    /// Route the listicle is published at, if the element declared one.
    pub route: Option<String>,
}

impl FeedDescription {
    /// Path prefix of item permalinks for nested listicles.
    fn permalink_prefix(&self) -> Option<String> {
        if !self.nested {
            return None;
        }
        let prefix = match &self.route {
            Some(route) => route.trim_matches('/').to_string(),
            None => self.name.clone(),
        };
        Some(prefix).filter(|p| !p.is_empty())
    }
}

/// One persisted feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    #[serde(rename = "renderedXML")]
    pub rendered_xml: String,
    /// Publish time in unix seconds, for ordering.
    #[serde(rename = "publishTimestampUnix")]
    pub published: i64,
}

// ============================================================================
// Store
// ============================================================================

/// Id → item map persisted between runs.
#[derive(Debug)]
pub struct FeedStore {
    path: PathBuf,
    items: BTreeMap<String, FeedItem>,
}

impl FeedStore {
    /// Open the store at `path`. A missing file is an empty store; a
    /// corrupt one is an error rather than silently losing publish dates.
    pub fn load(path: &Path) -> Result<Self, FeedError> {
        let items = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            items,
        })
    }

    pub fn get(&self, id: &str) -> Option<&FeedItem> {
        self.items.get(id)
    }

    /// The stored item for `id`, or a new one from `make` which is then
    /// stored.
    pub fn get_or_insert_with(&mut self, id: &str, make: impl FnOnce() -> FeedItem) -> FeedItem {
        self.items.entry(id.to_string()).or_insert_with(make).clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Write the whole store back as pretty JSON with sorted keys.
    pub fn save_all(&self) -> Result<(), FeedError> {
        let json = serde_json::to_string_pretty(&self.items)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

// ============================================================================
// XML
// ============================================================================

fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// Scheme-less form of a URL, e.g. `example.org`.
pub fn trim_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

/// Identifier of a listicle item in the store.
pub fn feed_item_id(listicle: &str, title: &str) -> String {
    if title.is_empty() {
        listicle.to_string()
    } else {
        format!("{listicle}/{title}")
    }
}

pub fn render_item(pub_date: &str, title: &str, brief: &str, link: &str) -> String {
    format!(
        "<item>\n  <title>{}</title>\n  <link>{}</link>\n  <description>{}</description>\n  <pubDate>{}</pubDate>\n</item>",
        escape(title),
        escape(link),
        escape(brief),
        pub_date
    )
}

/// A complete RSS 2.0 document. Items are indented one tab.
pub fn render_feed(title: &str, link: &str, description: &str, items: &[FeedItem]) -> String {
    let items: Vec<String> = items
        .iter()
        .map(|item| {
            item.rendered_xml
                .lines()
                .map(|line| format!("\t{line}"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();
    format!(
        "<rss version=\"2.0\">\n  <channel>\n    <title>{}</title>\n    <link>{}</link>\n    <description>{}</description>\n{}\n  </channel>\n</rss>",
        escape(title),
        escape(link),
        escape(description),
        items.join("\n")
    )
}

/// `canonical` with its path replaced by `path`.
pub fn construct_url(canonical: &Url, path: &str) -> String {
    let mut url = canonical.clone();
    url.set_path(path);
    url.to_string()
}

// ============================================================================
// Building
// ============================================================================

/// Listicle enumerating every feed, written next to the other sources so
/// it can be published with `cf feeds`.
pub fn feeds_listicle(feeds: &[FeedDescription]) -> String {
    feeds
        .iter()
        .map(|feed| {
            format!(
                "tt {name}.xml\nbb {desc}\nln /{name}.xml\n\n",
                name = feed.name,
                desc = feed.description
            )
        })
        .collect()
}

/// Items of one feed's listicle, taken from the store where known.
pub fn extract_feed_items(
    site: &Site,
    store: &mut FeedStore,
    feed: &FeedDescription,
    canonical: &Url,
    now: &DateTime<FixedOffset>,
) -> Result<Vec<FeedItem>, BuildError> {
    let path = site.source_path(&feed.name);
    let elements = directive::read_file(&path, &site.symbols)
        .map_err(|source| BuildError::Read { path, source })?;
    let prefix = feed.permalink_prefix();
    let pub_date = now.format(RFC822).to_string();

    let mut items = Vec::new();
    for element in &elements {
        let mut title = String::new();
        let mut brief = String::new();
        let mut link = None;
        for (kind, content) in element.commands(&site.symbols) {
            match kind {
                CommandKind::Title => title = content.to_string(),
                CommandKind::Brief => brief = markdown::sanitize(content),
                CommandKind::MarkdownSource => {
                    let article = markdown::article_name(content);
                    let path = match &prefix {
                        Some(prefix) => format!("{prefix}/{article}"),
                        None => article,
                    };
                    link = Some(construct_url(canonical, &path));
                }
                // First `ln` wins, as on the page; `md` still overrides.
                CommandKind::Link if link.is_some() => {}
                CommandKind::Link => {
                    link = Some(if content.starts_with("http") {
                        content.to_string()
                    } else {
                        construct_url(canonical, content)
                    });
                }
                _ => {}
            }
        }
        let Some(link) = link else {
            continue;
        };
        let id = feed_item_id(&feed.name, &title);
        let item = store.get_or_insert_with(&id, || {
            log::debug!("new feed item {id}");
            FeedItem {
                rendered_xml: render_item(&pub_date, &title, &brief, &link),
                published: now.timestamp(),
            }
        });
        items.push(item);
    }
    Ok(items)
}

/// Write every feed plus the combined feed, then persist the store.
///
/// Returns the written feed files.
pub fn build_feeds_at(
    site: &Site,
    feeds: &[FeedDescription],
    canonical: &Url,
    now: &DateTime<FixedOffset>,
) -> Result<Vec<PathBuf>, BuildError> {
    let mut store = FeedStore::load(&site.source_path(&site.config.files.feed_store))?;
    let base = canonical.as_str().trim_end_matches('/');
    let short = trim_scheme(base);
    fs::create_dir_all(&site.out)?;

    let mut written = Vec::new();
    let mut dump = |name: &str, description: &str, items: &[FeedItem]| -> Result<(), BuildError> {
        let xml = render_feed(&format!("{short} - {name}"), base, description, items);
        let path = site.out.join(format!("{name}.xml"));
        fs::write(&path, xml).map_err(|source| BuildError::Write {
            path: path.clone(),
            source,
        })?;
        log::debug!("feed written to {}", path.display());
        written.push(path);
        Ok(())
    };

    let mut combined = Vec::new();
    for feed in feeds.iter().filter(|f| f.name != ALL_FEED) {
        let items = extract_feed_items(site, &mut store, feed, canonical, now)?;
        dump(&feed.name, &feed.description, &items)?;
        combined.extend(items);
    }
    combined.sort_by(|a, b| b.published.cmp(&a.published));
    dump(ALL_FEED, &format!("all of {base}"), &combined)?;

    store.save_all()?;
    Ok(written)
}

/// [`build_feeds_at`] for the current local time. Without a canonical URL
/// nothing is written.
pub fn build_feeds(site: &Site, feeds: &[FeedDescription]) -> Result<Vec<PathBuf>, BuildError> {
    let Some(canonical) = &site.canonical_url else {
        log::warn!("feeds requested but no canonical url is set (--url), not writing feeds");
        return Ok(Vec::new());
    };
    build_feeds_at(site, feeds, canonical, &Local::now().fixed_offset())
}
