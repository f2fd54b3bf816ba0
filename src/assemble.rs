//! Page assembly.
//!
//! The root manifest is read twice:
//!
//! 1. **Discovery** collects the navigation bar (`nn` + `ww`) and the feed
//!    requests (`cc`, tied to the element's `cf`). Navigation has to be
//!    complete before the first page is rendered, since every page shows it.
//! 2. **Content** turns each element into a [`Page`] and merges it into the
//!    [`PageTree`] under its route.
//!
//! ## Merging
//!
//! Several elements may declare the same `ww`. They become one page, in
//! manifest order:
//!
//! ```text
//! <header>first element's tt/bb</header>
//! first element's body
//! <div class="spacer"></div>
//! second element's tt/bb markup
//! second element's body
//! ```
//!
//! The page keeps the first element's title and theme; later elements only
//! add content.
//!
//! After both passes the feeds are written, then every page with content is
//! wrapped in the site chrome and written to `<out>/<route>/index.html`.

use crate::context::{BuildError, Site};
use crate::directive::{self, Element};
use crate::feed::{self, ALL_FEED, FeedDescription};
use crate::fragment::{self, PageFragment};
use crate::markdown;
use crate::materialize::{self, MEDIA_DIR};
use crate::symbols::CommandKind;
use crate::template::{NavEntry, history_link};
use maud::html;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Separator between merged contributions to one route.
pub const SPACER: &str = "<div class=\"spacer\"></div>\n";

/// Content accumulated for one route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Body chunks in accumulation order.
    pub html: Vec<String>,
    /// Rendered `tt`/`bb`/`hi` markup of the element.
    pub header_content: Vec<String>,
    /// Route, title, brief and theme of the page.
    pub fragment: PageFragment,
    /// Listicle entries nest under this page's route.
    pub nested: bool,
}

impl Page {
    /// The `<header>` block, if the page has header content.
    pub fn produce_header(&self) -> Option<String> {
        if self.header_content.is_empty() {
            return None;
        }
        Some(format!(
            "<header>\n{}\n</header>\n",
            self.header_content.join("\n")
        ))
    }

    pub fn route(&self) -> &str {
        &self.fragment.webpath
    }
}

/// Route → page, ordered by route.
#[derive(Debug, Default)]
pub struct PageTree {
    pages: BTreeMap<String, Page>,
}

impl PageTree {
    /// Add a page, merging it into an existing page with the same route.
    pub fn merge(&mut self, mut page: Page) {
        let route = page.route().to_string();
        match self.pages.get_mut(&route) {
            Some(existing) if !existing.html.is_empty() => {
                existing.html.push(SPACER.to_string());
                existing.html.append(&mut page.header_content);
                existing.html.append(&mut page.html);
                existing.nested |= page.nested;
            }
            Some(existing) => {
                // Nothing rendered yet (e.g. a navigation-only element).
                let mut html: Vec<String> = page.produce_header().into_iter().collect();
                html.append(&mut page.html);
                existing.html = html;
                existing.nested |= page.nested;
                if existing.fragment.title.is_none() {
                    existing.fragment = page.fragment;
                }
            }
            None => {
                let mut html: Vec<String> = page.produce_header().into_iter().collect();
                html.append(&mut page.html);
                page.html = html;
                self.pages.insert(route, page);
            }
        }
    }

    pub fn get(&self, route: &str) -> Option<&Page> {
        self.pages.get(route)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Page)> {
        self.pages.iter()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// What one build produced.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Route and file of every written page.
    pub pages: Vec<(String, PathBuf)>,
    pub feeds: Vec<PathBuf>,
    pub navigation: Vec<NavEntry>,
    pub stylesheet: Option<PathBuf>,
}

// ============================================================================
// Pass 1: discovery
// ============================================================================

/// Navigation and feed requests of the root manifest.
#[derive(Debug, Default, PartialEq)]
pub struct Discovery {
    pub navigation: Vec<NavEntry>,
    pub feeds: Vec<FeedDescription>,
}

pub fn discover(site: &Site, elements: &[Element]) -> Discovery {
    let mut discovery = Discovery::default();
    for element in elements {
        let mut nav_text = None;
        let mut route = None;
        let mut nested = false;
        for (kind, content) in element.commands(&site.symbols) {
            match kind {
                CommandKind::NavigationTitle => nav_text = Some(content.to_string()),
                CommandKind::OutputPath => route = Some(content.to_string()),
                CommandKind::UnderCategory => nested = true,
                _ => {}
            }
        }

        let mut listicle: Option<&str> = None;
        for (kind, content) in element.commands(&site.symbols) {
            match kind {
                CommandKind::ListicleSource => listicle = Some(content),
                CommandKind::CreateRss => match listicle {
                    Some(name) => discovery.feeds.push(FeedDescription {
                        name: name.to_string(),
                        description: content.to_string(),
                        nested,
                        route: route.clone(),
                    }),
                    None => log::warn!(
                        "feed {content:?} ignored: `cc` must come after the listicle (`cf`) it publishes, in {element}"
                    ),
                },
                _ => {}
            }
        }

        if let Some(text) = nav_text.filter(|t| !t.is_empty()) {
            discovery.navigation.push(NavEntry {
                text,
                link: route.unwrap_or_default(),
            });
        }
    }
    discovery
}

/// The synthetic feed combining all others.
pub fn all_feed(site: &Site) -> FeedDescription {
    let base = site.canonical_base().unwrap_or_default();
    FeedDescription {
        name: ALL_FEED.to_string(),
        description: format!("all of {}", feed::trim_scheme(&base)),
        nested: false,
        route: None,
    }
}

// ============================================================================
// Pass 2: content
// ============================================================================

fn header_image(src: &str) -> String {
    html! { div { img.header-image src=(src); } }.into_string()
}

/// Build the page contributed by the root element at `index`.
pub fn build_page(site: &Site, index: usize, element: &Element) -> Result<Page, BuildError> {
    let mut page = Page {
        nested: element
            .commands(&site.symbols)
            .any(|(kind, _)| kind == CommandKind::UnderCategory),
        ..Page::default()
    };
    let pf = &mut page.fragment;

    for (kind, content) in element.commands(&site.symbols) {
        match kind {
            CommandKind::OutputPath => pf.webpath = content.to_string(),
            CommandKind::Title => {
                page.header_content.push(markdown::render(content));
                pf.title = Some(markdown::sanitize(content));
            }
            CommandKind::Brief => {
                page.header_content.push(markdown::render(content));
                pf.brief = Some(markdown::sanitize(content));
            }
            CommandKind::HeaderImage => {
                let name = materialize::base_name(content);
                materialize::persist_images(&site.out, &site.source, &[content.to_string()])?;
                page.header_content
                    .push(header_image(&format!("/{MEDIA_DIR}/{name}")));
            }
            CommandKind::Background => pf.background = Some(content.to_string()),
            CommandKind::ForegroundColor => pf.theme.foreground = Some(content.to_string()),
            CommandKind::BackgroundColor => pf.theme.background = Some(content.to_string()),
            CommandKind::LinkColor => pf.theme.link = Some(content.to_string()),
            CommandKind::CopyDir => {
                let Some(src) = site.copy_source(content) else {
                    continue;
                };
                if !src.is_dir() {
                    log::warn!("directory {} not found, copy skipped", src.display());
                    continue;
                }
                materialize::copy_directory(
                    &src,
                    &site.out,
                    &materialize::base_name(content),
                    &site.config.copy.ignore,
                )?;
            }
            CommandKind::MarkdownSource => {
                let path = site.source_path(content);
                let mut doc = match markdown::read_doc(&path) {
                    Ok(doc) => doc,
                    Err(e) => {
                        log::warn!("skipping markdown {}: {e}", path.display());
                        continue;
                    }
                };
                if !doc.images.is_empty() {
                    let base = path.parent().unwrap_or(site.source.as_path());
                    materialize::persist_images(&site.out, base, &doc.images)?;
                    doc.rewrite_image_urls(MEDIA_DIR);
                }
                page.html.push(doc.html);
            }
            CommandKind::ListicleSource => {
                if pf.webpath.is_empty() {
                    return Err(BuildError::ListicleBeforeRoute {
                        group: index + 1,
                        listicle: content.to_string(),
                        element: element.to_string(),
                    });
                }
                let path = site.source_path(content);
                let entries = directive::read_file(&path, &site.symbols)
                    .map_err(|source| BuildError::Read { path, source })?;
                log::debug!("listicle {content}: {} entries", entries.len());
                page.html.extend(fragment::extract_page_fragments(
                    site,
                    &pf.webpath,
                    page.nested,
                    &entries,
                )?);
            }
            CommandKind::Redirect => {
                let target = match pf.webpath.as_str() {
                    "" => "/",
                    route => route,
                };
                materialize::write_redirect(&site.out, content, target)?;
            }
            CommandKind::Link
            | CommandKind::Skip
            | CommandKind::NavigationTitle
            | CommandKind::Verbatim
            | CommandKind::Alias
            | CommandKind::Rename
            | CommandKind::UnderCategory
            | CommandKind::CreateRss
            | CommandKind::GitRepo
            | CommandKind::GitBranch
            | CommandKind::Unknown => {}
        }
    }
    Ok(page)
}

/// Content pass over the whole manifest.
pub fn assemble_pages(site: &Site, elements: &[Element]) -> Result<PageTree, BuildError> {
    let mut tree = PageTree::default();
    for (index, element) in elements.iter().enumerate() {
        let page = build_page(site, index, element)?;
        if page.route().is_empty() {
            if !page.html.is_empty() || !page.header_content.is_empty() {
                log::warn!("element {} has content but no output path (`ww`), not written: {element}", index + 1);
            }
            continue;
        }
        tree.merge(page);
    }
    Ok(tree)
}

/// Write every page with content. Returns route and file per page.
pub fn persist(site: &Site, tree: &PageTree) -> Result<Vec<(String, PathBuf)>, BuildError> {
    let mut written = Vec::new();
    for (route, page) in tree.iter() {
        if page.html.is_empty() {
            continue;
        }
        let file = site.out_path(route).join("index.html");
        let html = site.wrap(&page.fragment, &history_link(route), &page.html.concat())?;
        materialize::write_page(&file, &html).map_err(|source| BuildError::Write {
            path: file.clone(),
            source,
        })?;
        log::debug!("{route} -> {}", file.display());
        written.push((route.clone(), file));
    }
    Ok(written)
}

/// Copy the configured stylesheet to `<out>/style.css`.
fn copy_stylesheet(site: &Site) -> Result<Option<PathBuf>, BuildError> {
    let src = site.source_path(&site.config.css);
    if !src.is_file() {
        log::warn!("stylesheet {} not found, not copied", src.display());
        return Ok(None);
    }
    let dest = site.out.join("style.css");
    materialize::copy_file(&src, &dest)?;
    Ok(Some(dest))
}

/// Run the whole build for `site`.
pub fn build_site(site: &mut Site) -> Result<BuildReport, BuildError> {
    fs::create_dir_all(&site.out)?;
    let index = site.source_path(&site.config.files.index);
    let elements = directive::read_file(&index, &site.symbols)
        .map_err(|source| BuildError::Read { path: index, source })?;
    log::debug!("root manifest: {} elements", elements.len());

    let Discovery { navigation, mut feeds } = discover(site, &elements);
    site.navigation = navigation;
    let site: &Site = site;

    if !feeds.is_empty() {
        feeds.push(all_feed(site));
        let path = site.source_path(&site.config.files.feeds_listicle);
        fs::write(&path, feed::feeds_listicle(&feeds))
            .map_err(|source| BuildError::Write { path, source })?;
    }

    let tree = assemble_pages(site, &elements)?;
    let feed_files = if feeds.is_empty() {
        Vec::new()
    } else {
        feed::build_feeds(site, &feeds)?
    };
    let pages = persist(site, &tree)?;
    let stylesheet = copy_stylesheet(site)?;

    Ok(BuildReport {
        pages,
        feeds: feed_files,
        navigation: site.navigation.clone(),
        stylesheet,
    })
}
