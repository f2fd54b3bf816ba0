//! Filesystem materializer.
//!
//! Everything that puts bytes under the output directory goes through here:
//!
//! | Operation | Result |
//! |---|---|
//! | [`copy_directory`] | `<out>/<name>/...`, ignore-listed directories pruned |
//! | [`copy_file`] | single file copy, parents created |
//! | [`write_redirect`] / [`write_alias`] | meta-refresh stub, never clobbers |
//! | [`rename_output`] | moves an output path, replacing the destination |
//! | [`persist_images`] | `<out>/media/<basename>` |
//! | [`write_page`] | final page HTML, parents created |
//!
//! Paths inside the output tree are given as routes (`/a/b`); a leading
//! slash never escapes `<out>`.

use maud::{DOCTYPE, html};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Output subdirectory holding images referenced from markdown.
pub const MEDIA_DIR: &str = "media";

/// `<out>/<route>` with the route's leading slash removed.
pub fn out_path(out: &Path, route: &str) -> PathBuf {
    let trimmed = route.trim_start_matches('/');
    if trimmed.is_empty() {
        out.to_path_buf()
    } else {
        out.join(trimmed)
    }
}

/// Join route segments into a slash-rooted route, dropping empty segments.
///
/// ```text
/// ["/", "about"]        -> /about
/// ["/projects/", "/x"]  -> /projects/x
/// []                    -> /
/// ```
pub fn join_route(parts: &[&str]) -> String {
    let segments: Vec<&str> = parts
        .iter()
        .flat_map(|p| p.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Copy targets that would pull a whole filesystem or home into the site.
pub fn is_dangerous_copy_source(path: &str) -> bool {
    matches!(path.trim(), "/" | "~")
}

/// Whether `path` resolves to the filesystem root or to `home`.
///
/// Catches spellings the string check misses (`//`, `/.`, `~/`, `a/../..`).
/// A path that does not exist is not protected.
pub fn is_protected_path(path: &Path, home: Option<&Path>) -> bool {
    let Ok(resolved) = path.canonicalize() else {
        return false;
    };
    if resolved.parent().is_none() {
        return true;
    }
    home.and_then(|h| h.canonicalize().ok())
        .is_some_and(|h| h == resolved)
}

/// Last component of a path as a string.
pub fn base_name(path: &str) -> String {
    Path::new(path.trim_end_matches('/'))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Recursively copy `src` to `<out>/<dest_name>`.
///
/// Directories whose name is in `ignore` are skipped at any depth. Returns
/// the destination root.
pub fn copy_directory(
    src: &Path,
    out: &Path,
    dest_name: &str,
    ignore: &[String],
) -> io::Result<PathBuf> {
    let dest = out_path(out, dest_name);
    fs::create_dir_all(&dest)?;

    let walker = WalkDir::new(src).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !ignore
                .iter()
                .any(|name| entry.file_name().to_string_lossy() == name.as_str())
    });

    for entry in walker {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(dest)
}

/// Copy one file, creating the destination's parent directories.
pub fn copy_file(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dest)?;
    Ok(())
}

/// Write `content` to `path` unless something is already there.
///
/// Returns whether the file was created.
pub fn write_if_missing(path: &Path, content: &str) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(true)
}

/// Minimal document that forwards the browser to `target`.
pub fn redirect_stub(target: &str) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Redirecting to " (target) }
                meta http-equiv="refresh" content={ "0; url=" (target) };
                link rel="canonical" href=(target);
            }
            body {
                p { "Moved to " a href=(target) { (target) } "." }
            }
        }
    }
    .into_string()
}

/// File a redirect at `route` is written to.
///
/// A route ending in `.html` names the file itself, anything else is a
/// directory served through its `index.html`.
pub fn redirect_file(out: &Path, route: &str) -> PathBuf {
    let base = out_path(out, route);
    if route.ends_with(".html") {
        base
    } else {
        base.join("index.html")
    }
}

/// Write a redirect stub at `from` pointing to `to`.
///
/// Never overwrites: returns `Ok(false)` when the destination exists.
pub fn write_redirect(out: &Path, from: &str, to: &str) -> io::Result<bool> {
    let file = redirect_file(out, from);
    let written = write_if_missing(&file, &redirect_stub(to))?;
    if written {
        log::debug!("redirect {from} -> {to}");
    } else {
        log::debug!("redirect {from} already present, left alone");
    }
    Ok(written)
}

/// Write an alias route for `to`.
///
/// An alias is always a directory route, even when its name ends in
/// `.html`, so `/x.html` becomes `/x.html/index.html`.
pub fn write_alias(out: &Path, alias: &str, to: &str) -> io::Result<bool> {
    let file = out_path(out, alias).join("index.html");
    let written = write_if_missing(&file, &redirect_stub(to))?;
    if written {
        log::debug!("alias {alias} -> {to}");
    }
    Ok(written)
}

/// Move `<out>/<from>` to `<out>/<to>`, removing an existing directory at
/// the destination first.
pub fn rename_output(out: &Path, from: &str, to: &str) -> io::Result<()> {
    let source = out_path(out, from);
    let dest = out_path(out, to);
    if dest.is_dir() {
        fs::remove_dir_all(&dest)?;
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(&source, &dest)?;
    log::debug!("renamed {} to {}", source.display(), dest.display());
    Ok(())
}

/// Copy images referenced by a markdown file into `<out>/media/`.
///
/// `images` are resolved relative to `base_dir`. Missing images are
/// reported and skipped. Returns the number of images copied.
pub fn persist_images(out: &Path, base_dir: &Path, images: &[String]) -> io::Result<usize> {
    let media = out.join(MEDIA_DIR);
    fs::create_dir_all(&media)?;
    let mut copied = 0;
    for image in images {
        let src = base_dir.join(image);
        if !src.is_file() {
            log::warn!("image {} not found, skipping", src.display());
            continue;
        }
        fs::copy(&src, media.join(base_name(image)))?;
        copied += 1;
    }
    Ok(copied)
}

/// Write a finished page, creating parent directories.
pub fn write_page(path: &Path, html: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn join_route_normalizes_slashes() {
        assert_eq!(join_route(&["/", "about"]), "/about");
        assert_eq!(join_route(&["/projects/", "/x"]), "/projects/x");
        assert_eq!(join_route(&["", "notes"]), "/notes");
        assert_eq!(join_route(&[]), "/");
    }

    #[test]
    fn out_path_strips_leading_slash() {
        let out = Path::new("/tmp/web");
        assert_eq!(out_path(out, "/a/b"), PathBuf::from("/tmp/web/a/b"));
        assert_eq!(out_path(out, "/"), PathBuf::from("/tmp/web"));
    }

    #[test]
    fn dangerous_sources() {
        assert!(is_dangerous_copy_source("/"));
        assert!(is_dangerous_copy_source("~"));
        assert!(!is_dangerous_copy_source("~/music"));
        assert!(!is_dangerous_copy_source("assets"));
    }

    #[test]
    fn root_and_home_are_protected_however_spelled() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        fs::create_dir_all(home.join("music")).unwrap();

        for root in ["/", "//", "/.", "/tmp/.."] {
            assert!(is_protected_path(Path::new(root), None), "{root}");
        }
        assert!(is_protected_path(&home.join(""), Some(&home)));
        assert!(is_protected_path(&home.join("music/.."), Some(&home)));
        assert!(!is_protected_path(&home.join("music"), Some(&home)));
        assert!(!is_protected_path(&home.join("missing"), Some(&home)));
    }

    #[test]
    fn copy_directory_prunes_ignored_names() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src/site");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::create_dir_all(src.join(".git/objects")).unwrap();
        fs::create_dir_all(src.join("sub/node_modules/pkg")).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::write(src.join("sub/b.txt"), "b").unwrap();
        fs::write(src.join(".git/HEAD"), "ref").unwrap();
        fs::write(src.join("sub/node_modules/pkg/x.js"), "x").unwrap();

        let out = tmp.path().join("web");
        let ignore = vec![".git".to_string(), "node_modules".to_string()];
        let dest = copy_directory(&src, &out, "site", &ignore).unwrap();

        assert_eq!(dest, out.join("site"));
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dest.join("sub/b.txt")).unwrap(), "b");
        assert!(!dest.join(".git").exists());
        assert!(!dest.join("sub/node_modules").exists());
    }

    #[test]
    fn redirect_is_never_overwritten() {
        let tmp = TempDir::new().unwrap();
        assert!(write_redirect(tmp.path(), "/old", "/new").unwrap());
        assert!(!write_redirect(tmp.path(), "/old", "/other").unwrap());

        let content = fs::read_to_string(tmp.path().join("old/index.html")).unwrap();
        assert!(content.contains("url=/new"));
        assert!(!content.contains("/other"));
    }

    #[test]
    fn redirect_to_html_file_writes_that_file() {
        let tmp = TempDir::new().unwrap();
        write_redirect(tmp.path(), "/legacy/page.html", "/page").unwrap();
        assert!(tmp.path().join("legacy/page.html").is_file());
        assert!(!tmp.path().join("legacy/page.html/index.html").exists());
    }

    #[test]
    fn alias_always_creates_directory_route() {
        let tmp = TempDir::new().unwrap();
        assert!(write_alias(tmp.path(), "/x.html", "/projects").unwrap());
        assert!(tmp.path().join("x.html/index.html").is_file());
        assert!(!write_alias(tmp.path(), "/x.html", "/elsewhere").unwrap());
    }

    #[test]
    fn rename_replaces_existing_destination() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("draft")).unwrap();
        fs::write(tmp.path().join("draft/index.html"), "new").unwrap();
        fs::create_dir_all(tmp.path().join("final")).unwrap();
        fs::write(tmp.path().join("final/stale.html"), "old").unwrap();

        rename_output(tmp.path(), "/draft", "final").unwrap();

        assert!(!tmp.path().join("draft").exists());
        assert!(!tmp.path().join("final/stale.html").exists());
        assert_eq!(
            fs::read_to_string(tmp.path().join("final/index.html")).unwrap(),
            "new"
        );
    }

    #[test]
    fn persist_images_skips_missing() {
        let tmp = TempDir::new().unwrap();
        let notes = tmp.path().join("notes");
        fs::create_dir_all(notes.join("pics")).unwrap();
        fs::write(notes.join("pics/cat.png"), b"png").unwrap();

        let out = tmp.path().join("web");
        let copied = persist_images(
            &out,
            &notes,
            &["pics/cat.png".to_string(), "pics/dog.png".to_string()],
        )
        .unwrap();

        assert_eq!(copied, 1);
        assert!(out.join("media/cat.png").is_file());
        assert!(!out.join("media/dog.png").exists());
    }

    #[test]
    fn write_if_missing_reports_creation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/file");
        assert!(write_if_missing(&path, "one").unwrap());
        assert!(!write_if_missing(&path, "two").unwrap());
        assert_eq!(fs::read_to_string(path).unwrap(), "one");
    }
}
