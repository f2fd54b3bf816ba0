//! # plainweb
//!
//! A static site generator driven by a tiny line-oriented directive
//! language. A root manifest (`index`) lists elements, blank-line
//! separated, each made of two-letter directive lines:
//!
//! ```text
//! ww /projects        output route
//! tt Projects         title
//! bb Things I built   brief
//! cf projects         embed a listicle
//! ```
//!
//! Listicles are manifests of the same language whose elements become
//! `<dt>`/`<dd>` entries on the embedding page, and may themselves pull in
//! markdown pages, mirrored git repositories, copied directories, redirects
//! and aliases.
//!
//! # Build Passes
//!
//! ```text
//! 1. Discover   index  →  navigation entries + feed requests
//! 2. Assemble   index  →  page tree (route → body chunks)
//! 3. Feeds      feed requests + rss-store.json  →  <name>.xml, all.xml
//! 4. Persist    page tree  →  <out>/<route>/index.html
//! ```
//!
//! Listicle entries write their own side outputs (markdown articles, git
//! mirrors, copies, redirect stubs) while they are resolved during pass 2.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`symbols`] | Two-letter directive codes → command kinds, user-extensible |
//! | [`directive`] | Splits manifest text into elements of code/content pairs |
//! | [`context`] | The explicit per-run [`context::Site`] and the pipeline error |
//! | [`markdown`] | pulldown-cmark rendering, wiki links, local image handling |
//! | [`fragment`] | Resolves listicle elements into page fragments and side effects |
//! | [`template`] | Header/footer templates, nav bar, theme and page metadata |
//! | [`materialize`] | Output paths, copies, redirect and alias stubs, media |
//! | [`git`] | Bare-repository mirrors behind the [`git::GitMirror`] trait |
//! | [`assemble`] | Discovery and page assembly for the root manifest |
//! | [`feed`] | RSS feeds and the persisted feed item store |
//! | [`preview`] | Open-graph tags and generated preview images |
//! | [`scaffold`] | Starter files written on first run |
//! | [`config`] | `config.toml` loading, validation and stock defaults |
//! | [`output`] | CLI output formatting of the build summary |
//!
//! # Design Decisions
//!
//! ## One Context, No Globals
//!
//! Everything a pass needs (configuration, symbol table, templates,
//! navigation, canonical URL, git collaborator) lives on [`context::Site`]
//! and is passed by reference. Navigation is the only field filled during
//! the build, by the discovery pass, before any page renders.
//!
//! ## Stable Feeds
//!
//! Feed items are rendered once and stored with their first publish time
//! in `rss-store.json`. Later builds reuse the stored XML, so readers
//! never see an item re-dated or duplicated.
//!
//! ## Maud For Markup
//!
//! Fragments, navigation, metadata tags and redirect stubs are built with
//! [Maud](https://maud.lambda.xyz/), so interpolated titles are escaped.
//! Only the header and footer are user-editable text templates.

pub mod assemble;
pub mod config;
pub mod context;
pub mod directive;
pub mod feed;
pub mod fragment;
pub mod git;
pub mod markdown;
pub mod materialize;
pub mod output;
pub mod preview;
pub mod scaffold;
pub mod symbols;
pub mod template;

#[cfg(test)]
pub(crate) mod test_helpers;
