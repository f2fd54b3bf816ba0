//! Open-graph previews.
//!
//! Enabled with `--generate-previews`. Each titled page gets a set of
//! `og:` meta tags and a PNG card at `<out>/og/<slug>.png`.
//!
//! The card is a pure function of `(title, subtitle, size)`: a SHA-256 of
//! the text picks a background and an accent color, and the text lengths
//! shape the accent bars. No fonts are rasterized, so identical inputs
//! always produce identical bytes and a rebuild never churns the images.

use crate::config::PreviewConfig;
use image::{ImageFormat, Rgb, RgbImage};
use maud::html;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Output subdirectory for preview images.
pub const PREVIEW_DIR: &str = "og";

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSettings {
    pub width: u32,
    pub height: u32,
}

impl From<&PreviewConfig> for PreviewSettings {
    fn from(config: &PreviewConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
        }
    }
}

/// File-name slug: lowercase, spaces become dashes.
pub fn preview_slug(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// Open-graph and twitter-card tags for a page.
pub fn metadata(title: &str, subtitle: &str, image_url: &str, settings: &PreviewSettings) -> String {
    html! {
        meta property="og:title" content=(title);
        @if !subtitle.is_empty() {
            meta property="og:description" content=(subtitle);
        }
        meta property="og:image" content=(image_url);
        meta property="og:image:width" content=(settings.width);
        meta property="og:image:height" content=(settings.height);
        meta name="twitter:card" content="summary_large_image";
    }
    .into_string()
}

/// Render the preview card.
pub fn render_image(title: &str, subtitle: &str, settings: &PreviewSettings) -> RgbImage {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(subtitle.as_bytes());
    let digest = hasher.finalize();

    let background = Rgb([digest[0] / 4, digest[1] / 4, digest[2] / 4]);
    let accent = Rgb([
        digest[3] | 0x80,
        digest[4] | 0x80,
        digest[5] | 0x80,
    ]);

    let (width, height) = (settings.width, settings.height);
    let margin = width / 16;
    // Title bar length follows the title, capped to the card width.
    let title_len = (title.chars().count() as u32).clamp(1, 40);
    let title_end = margin + (width - 2 * margin) * title_len / 40;
    let subtitle_len = (subtitle.chars().count() as u32).clamp(0, 80);
    let subtitle_end = margin + (width - 2 * margin) * subtitle_len / 80;

    let title_band = (height * 2 / 5)..(height / 2);
    let subtitle_band = (height * 11 / 20)..(height * 3 / 5);
    let stripe = (height - height / 24)..height;

    RgbImage::from_fn(width, height, |x, y| {
        let in_title = title_band.contains(&y) && (margin..title_end).contains(&x);
        let in_subtitle = subtitle_band.contains(&y) && (margin..subtitle_end).contains(&x);
        if in_title || in_subtitle || stripe.contains(&y) {
            accent
        } else {
            background
        }
    })
}

/// Render and save the preview card as PNG, creating parent directories.
pub fn generate_image(
    title: &str,
    subtitle: &str,
    path: &Path,
    settings: &PreviewSettings,
) -> Result<(), PreviewError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    render_image(title, subtitle, settings).save_with_format(path, ImageFormat::Png)?;
    log::debug!("preview image written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SMALL: PreviewSettings = PreviewSettings {
        width: 64,
        height: 32,
    };

    #[test]
    fn slug_lowercases_and_dashes() {
        assert_eq!(preview_slug("Plain Web Notes"), "plain-web-notes");
        assert_eq!(preview_slug(" lieu "), "lieu");
    }

    #[test]
    fn metadata_contains_og_tags() {
        let meta = metadata("Lieu", "a search engine", "https://x.org/og/lieu.png", &SMALL);
        assert!(meta.contains(r#"<meta property="og:title" content="Lieu">"#));
        assert!(meta.contains(r#"<meta property="og:description" content="a search engine">"#));
        assert!(meta.contains(r#"<meta property="og:image" content="https://x.org/og/lieu.png">"#));
        assert!(meta.contains(r#"content="64""#));
    }

    #[test]
    fn metadata_omits_empty_description() {
        let meta = metadata("Lieu", "", "/og/lieu.png", &SMALL);
        assert!(!meta.contains("og:description"));
    }

    #[test]
    fn image_is_deterministic() {
        let a = render_image("Title", "Sub", &SMALL);
        let b = render_image("Title", "Sub", &SMALL);
        assert_eq!(a.as_raw(), b.as_raw());
        assert_eq!(a.dimensions(), (64, 32));
    }

    #[test]
    fn different_text_gives_different_image() {
        let a = render_image("Title", "Sub", &SMALL);
        let b = render_image("Other", "Sub", &SMALL);
        assert_ne!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn generate_writes_png() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("og/card.png");
        generate_image("Title", "Sub", &path, &SMALL).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
