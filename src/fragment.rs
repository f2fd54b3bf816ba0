//! Fragment resolution.
//!
//! A listicle element becomes a [`PageFragment`] in two stages:
//!
//! ```text
//! Element ──collect_attributes──▶ Draft ──apply_effects──▶ PageFragment ──render──▶ <dt>/<dd>
//!            (tt bb ln ww br       (fragment +              (cp vb md mv as
//!             bg sf sb sl)          overrides)               rn gt, in order)
//! ```
//!
//! The first stage only reads: it gathers titles, colors and the overrides
//! later commands depend on (`ww` renames copy/markdown destinations, `br`
//! picks the branch a mirror pushes). The second stage performs the side
//! effects in the order they appear in the element, with the draft fully
//! known, so moving a `ww` line below an `md` line changes nothing.
//!
//! ## Failure handling
//!
//! | Situation | Outcome |
//! |---|---|
//! | `ln` given twice | warning, first link kept |
//! | `cp`/`vb` of the root or home, however spelled | warning, command skipped |
//! | missing `cp`/`vb` source | warning, command skipped |
//! | unreadable `md` file | warning, command skipped |
//! | git failure, unreadable README, write failure | fatal [`BuildError`] |

use crate::context::{BuildError, Site};
use crate::directive::Element;
use crate::git::{self, RepoStats};
use crate::markdown::{self, MarkdownDoc};
use crate::materialize::{self, MEDIA_DIR};
use crate::symbols::CommandKind;
use crate::template::Theme;
use maud::{PreEscaped, html};
use std::path::Path;

/// Output subdirectory holding bare repository mirrors.
pub const GIT_DIR: &str = "_git";

/// README file names looked up in a mirrored repository, in order.
pub const README_VARIANTS: [&str; 3] = ["README.md", "readme.md", "README"];

/// Resolved attributes of one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFragment {
    /// Route of the page the fragment is listed on.
    pub webpath: String,
    /// Whether generated pages nest under `webpath`.
    pub under_parent: bool,
    pub title: Option<String>,
    /// Markdown.
    pub brief: Option<String>,
    pub link: Option<String>,
    pub background: Option<String>,
    pub theme: Theme,
    /// Markdown source the fragment's page was generated from.
    pub location: Option<String>,
    /// Extra `<head>` tags.
    pub metadata: Vec<String>,
}

impl PageFragment {
    pub fn new(webpath: &str, under_parent: bool) -> Self {
        Self {
            webpath: webpath.to_string(),
            under_parent,
            ..Self::default()
        }
    }

    /// Set the link unless one is already set. Returns whether it was set.
    pub fn set_link(&mut self, link: &str) -> bool {
        if let Some(existing) = &self.link {
            log::warn!("link {link:?} ignored, fragment already links to {existing:?}");
            return false;
        }
        self.link = Some(link.to_string());
        true
    }

    /// Route of a page generated for this fragment under `article`.
    pub fn article_route(&self, article: &str) -> String {
        if self.under_parent {
            materialize::join_route(&[&self.webpath, article])
        } else {
            materialize::join_route(&[article])
        }
    }

    /// `<dt>`/`<dd>` markup. Untitled fragments render as nothing.
    pub fn render(&self) -> String {
        let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) else {
            return String::new();
        };
        let brief = markdown::render(self.brief.as_deref().unwrap_or_default());
        html! {
            @match &self.link {
                Some(link) => {
                    dt { a href=(link) { (title) } }
                }
                None => {
                    dt { (title) }
                }
            }
            dd { (PreEscaped(brief)) }
        }
        .into_string()
    }
}

/// A fragment after attribute collection, before any side effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub fragment: PageFragment,
    /// Branch the mirror's post-commit hook pushes.
    pub branch: String,
    /// Destination name set with `ww`.
    pub dest_override: Option<String>,
}

/// First stage: gather attributes, perform nothing.
pub fn collect_attributes(
    site: &Site,
    webpath: &str,
    under_parent: bool,
    element: &Element,
) -> Draft {
    let mut draft = Draft {
        fragment: PageFragment::new(webpath, under_parent),
        branch: site.config.git.default_branch.clone(),
        dest_override: None,
    };
    let pf = &mut draft.fragment;

    for (kind, content) in element.commands(&site.symbols) {
        match kind {
            CommandKind::Title => pf.title = Some(content.to_string()),
            CommandKind::Brief => pf.brief = Some(content.to_string()),
            CommandKind::Link => {
                if !pf.set_link(content) {
                    log::warn!("in element {element}");
                }
            }
            CommandKind::Background => pf.background = Some(content.to_string()),
            CommandKind::ForegroundColor => pf.theme.foreground = Some(content.to_string()),
            CommandKind::BackgroundColor => pf.theme.background = Some(content.to_string()),
            CommandKind::LinkColor => pf.theme.link = Some(content.to_string()),
            CommandKind::GitBranch => draft.branch = content.to_string(),
            CommandKind::OutputPath => draft.dest_override = Some(content.to_string()),
            CommandKind::Skip
            | CommandKind::NavigationTitle
            | CommandKind::ListicleSource
            | CommandKind::MarkdownSource
            | CommandKind::Verbatim
            | CommandKind::CopyDir
            | CommandKind::Redirect
            | CommandKind::Alias
            | CommandKind::Rename
            | CommandKind::UnderCategory
            | CommandKind::CreateRss
            | CommandKind::HeaderImage
            | CommandKind::GitRepo
            | CommandKind::Unknown => {}
        }
    }
    draft
}

/// Second stage: run the element's effects in order.
pub fn apply_effects(site: &Site, draft: Draft, element: &Element) -> Result<PageFragment, BuildError> {
    let Draft {
        mut fragment,
        branch,
        dest_override,
    } = draft;
    let dest = dest_override.as_deref();

    for (kind, content) in element.commands(&site.symbols) {
        match kind {
            CommandKind::CopyDir => copy_directory(site, &mut fragment, dest, content)?,
            CommandKind::Verbatim => copy_verbatim(site, &mut fragment, dest, content)?,
            CommandKind::MarkdownSource => markdown_page(site, &mut fragment, dest, content)?,
            CommandKind::Redirect => {
                let target = current_target(&fragment);
                materialize::write_redirect(&site.out, content, &target)?;
            }
            CommandKind::Alias => {
                let target = current_target(&fragment);
                materialize::write_alias(&site.out, content, &target)?;
            }
            CommandKind::Rename => rename(site, &mut fragment, content)?,
            CommandKind::GitRepo => mirror_repository(site, &mut fragment, &branch, dest, content)?,
            CommandKind::Title
            | CommandKind::Brief
            | CommandKind::Link
            | CommandKind::Skip
            | CommandKind::NavigationTitle
            | CommandKind::ListicleSource
            | CommandKind::OutputPath
            | CommandKind::UnderCategory
            | CommandKind::CreateRss
            | CommandKind::Background
            | CommandKind::ForegroundColor
            | CommandKind::BackgroundColor
            | CommandKind::HeaderImage
            | CommandKind::LinkColor
            | CommandKind::GitBranch
            | CommandKind::Unknown => {}
        }
    }
    Ok(fragment)
}

/// Both stages for one element.
pub fn resolve_element(
    site: &Site,
    webpath: &str,
    under_parent: bool,
    element: &Element,
) -> Result<PageFragment, BuildError> {
    let draft = collect_attributes(site, webpath, under_parent, element);
    apply_effects(site, draft, element)
}

/// Resolve every element of a listicle into its `<dl>` markup.
pub fn extract_page_fragments(
    site: &Site,
    webpath: &str,
    under_parent: bool,
    elements: &[Element],
) -> Result<Vec<String>, BuildError> {
    let mut html = Vec::with_capacity(elements.len() + 2);
    html.push("<dl class='listicle'>".to_string());
    for element in elements {
        html.push(resolve_element(site, webpath, under_parent, element)?.render());
    }
    html.push("</dl>".to_string());
    Ok(html)
}

// ============================================================================
// Effects
// ============================================================================

/// Where redirects and aliases declared by a fragment point.
fn current_target(fragment: &PageFragment) -> String {
    fragment
        .link
        .clone()
        .unwrap_or_else(|| fragment.webpath.clone())
}

fn copy_directory(
    site: &Site,
    fragment: &mut PageFragment,
    dest: Option<&str>,
    content: &str,
) -> Result<(), BuildError> {
    let Some(src) = site.copy_source(content) else {
        return Ok(());
    };
    if !src.is_dir() {
        log::warn!("directory {} not found, copy skipped", src.display());
        return Ok(());
    }
    let name = dest
        .map(str::to_string)
        .unwrap_or_else(|| materialize::base_name(content));
    log::debug!("copying directory {} to /{name}", src.display());
    materialize::copy_directory(&src, &site.out, &name, &site.config.copy.ignore)?;
    fragment.link = Some(materialize::join_route(&[&name]));
    Ok(())
}

/// Single-file copy to the output root. The file keeps its own name; a
/// `ww` override only changes the link.
fn copy_verbatim(
    site: &Site,
    fragment: &mut PageFragment,
    dest: Option<&str>,
    content: &str,
) -> Result<(), BuildError> {
    let Some(src) = site.copy_source(content) else {
        return Ok(());
    };
    if !src.is_file() {
        log::warn!("file {} not found, copy skipped", src.display());
        return Ok(());
    }
    let name = materialize::base_name(content);
    materialize::copy_file(&src, &site.out.join(&name))?;
    fragment.link = Some(materialize::join_route(&[dest.unwrap_or(&name)]));
    Ok(())
}

fn markdown_page(
    site: &Site,
    fragment: &mut PageFragment,
    dest: Option<&str>,
    content: &str,
) -> Result<(), BuildError> {
    fragment.location = Some(content.trim().to_string());
    let path = site.source_path(content);
    let doc = match markdown::read_doc(&path) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("skipping markdown {}: {e}", path.display());
            return Ok(());
        }
    };
    let article = dest
        .map(str::to_string)
        .unwrap_or_else(|| markdown::article_name(content));
    write_markdown_page(site, fragment, &path, &article, doc)?;
    fragment.link = Some(fragment.article_route(&article));
    Ok(())
}

/// Write a rendered markdown document as the page for `article`.
///
/// Local images are copied to the media directory first, relative to the
/// markdown file's own directory.
pub fn write_markdown_page(
    site: &Site,
    fragment: &PageFragment,
    md_path: &Path,
    article: &str,
    mut doc: MarkdownDoc,
) -> Result<(), BuildError> {
    let route = fragment.article_route(article);
    if !doc.images.is_empty() {
        let base = md_path.parent().unwrap_or(site.source.as_path());
        materialize::persist_images(&site.out, base, &doc.images)?;
        doc.rewrite_image_urls(MEDIA_DIR);
    }
    let html = site.wrap(fragment, &fragment.webpath, &doc.html)?;
    let outfile = site.out_path(&route).join("index.html");
    log::debug!("writing {}", outfile.display());
    materialize::write_page(&outfile, &html).map_err(|source| BuildError::Write {
        path: outfile.clone(),
        source,
    })
}

fn rename(site: &Site, fragment: &mut PageFragment, content: &str) -> Result<(), BuildError> {
    let Some(from) = fragment.link.clone() else {
        log::warn!("nothing to rename to {content:?}, the fragment has no link yet");
        return Ok(());
    };
    materialize::rename_output(&site.out, &from, content)?;
    fragment.link = Some(materialize::join_route(&[content]));
    Ok(())
}

// ============================================================================
// Git mirrors
// ============================================================================

/// Public clone URL of a mirrored repository.
///
/// Served from the `git.` subdomain of the canonical host; without a
/// canonical URL the mirror's path in the output tree is used.
pub fn clone_url(site: &Site, repo: &str) -> String {
    let host = site.host();
    if host.is_empty() {
        format!("/{GIT_DIR}/{repo}.git")
    } else {
        format!("http://git.{host}/{repo}.git")
    }
}

/// VCS autodiscovery tags for a repository page.
pub fn vcs_metadata(site: &Site, branch: &str, clone_url: &str, repo: &str) -> Vec<String> {
    let mut tags = vec![
        html! { meta name="vcs" content="git"; }.into_string(),
        html! { meta name="vcs:default-branch" content=(branch); }.into_string(),
        html! { meta name="vcs:clone" content=(clone_url); }.into_string(),
    ];
    if let Some(base) = site.canonical_base() {
        let summary = format!("{base}/{repo}");
        tags.push(html! { meta name="forge:summary" content=(summary); }.into_string());
    }
    tags
}

/// Put the clone box after a leading `<h1>` line, or at the very top.
pub fn inject_clone_line(html: &str, stats: &RepoStats, clone_url: &str) -> String {
    let clone = html! {
        div #clone {
            span { (stats) }
            span { "git clone " (clone_url) }
        }
    }
    .into_string();

    match html.split_once('\n') {
        Some((first, rest)) if first.contains("<h1>") => format!("{first}\n{clone}\n{rest}"),
        None if html.contains("<h1>") => format!("{html}\n{clone}"),
        _ => format!("{clone}\n{html}"),
    }
}

fn mirror_repository(
    site: &Site,
    fragment: &mut PageFragment,
    branch: &str,
    dest: Option<&str>,
    content: &str,
) -> Result<(), BuildError> {
    let src = site.source_path(content);
    let git_root = site.out.join(GIT_DIR);
    let mirror = site.git().ensure_mirror(&src, &git_root, branch)?;
    let stats = site.git().repo_stats(&mirror)?;
    log::debug!("{}: {stats}", mirror.display());

    let repo = git::repo_name(content);
    if fragment.title.as_deref().is_none_or(str::is_empty) {
        fragment.title = Some(repo.clone());
    }
    let clone = clone_url(site, &repo);
    fragment
        .metadata
        .extend(vcs_metadata(site, branch, &clone, &repo));

    let Some(readme) = README_VARIANTS
        .iter()
        .map(|name| src.join(name))
        .find(|path| path.is_file())
    else {
        log::warn!("no README in {}, no page written", src.display());
        return Ok(());
    };

    let mut doc = markdown::read_doc(&readme).map_err(|source| BuildError::Read {
        path: readme.clone(),
        source,
    })?;
    doc.html = inject_clone_line(&doc.html, &stats, &clone);
    let article = dest.unwrap_or(&repo).to_string();
    write_markdown_page(site, fragment, &readme, &article, doc)?;
    fragment.link = Some(fragment.article_route(&article));
    Ok(())
}
