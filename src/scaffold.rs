//! First-run scaffolding.
//!
//! Running in a directory without an index manifest creates a small,
//! working site to start from:
//!
//! ```text
//! index       root manifest            (created if missing)
//! projects    example listicle         (only together with a new index)
//! contacts    example listicle         (only together with a new index)
//! style.css   default stylesheet       (created if missing)
//! symbols     stock directive codes    (created if missing)
//! ```
//!
//! Existing files are never touched.

use crate::config::SiteConfig;
use crate::materialize::write_if_missing;
use crate::symbols;
use std::io;
use std::path::{Path, PathBuf};

const EXAMPLE_INDEX: &str = include_str!("../static/example-index");
const EXAMPLE_LISTICLE: &str = include_str!("../static/example-listicle");
const EXAMPLE_CONTACTS: &str = include_str!("../static/example-contacts");
const DEFAULT_CSS: &str = include_str!("../static/default-style.css");

/// Create the starter files that are missing. Returns the created paths.
pub fn populate(source: &Path, config: &SiteConfig) -> io::Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    let mut create = |name: &str, content: &str| -> io::Result<bool> {
        let path = source.join(name);
        let fresh = write_if_missing(&path, content)?;
        if fresh {
            log::info!("created {}", path.display());
            created.push(path);
        }
        Ok(fresh)
    };

    if create(&config.files.index, EXAMPLE_INDEX)? {
        create("projects", EXAMPLE_LISTICLE)?;
        create("contacts", EXAMPLE_CONTACTS)?;
    }
    create(&config.css, DEFAULT_CSS)?;
    create(&config.files.symbols, symbols::stock_mapping())?;
    Ok(created)
}
