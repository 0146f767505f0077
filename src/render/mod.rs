//! Markdown rendering for mdr
//!
//! This module turns markdown source into a complete page using comrak:
//! a document tree ready to be mounted in the preview frame, its HTML, the
//! heading outline, and basic text statistics.

mod convert;
mod page;

pub use convert::slugify;

use crate::config::{HighlightColor, Palette, Settings, Theme};
use crate::dom::DocumentTree;
use crate::error::{Error, Result};
use crate::theme::page_css;
use comrak::{parse_document, Arena, Options};
use convert::Converter;
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of the heading outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
}

/// Appearance and parsing options for a render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub theme: Theme,
    pub palette: Palette,
    /// Font scale in percent
    pub font_scale: u16,
    pub highlight_color: HighlightColor,
    /// User stylesheet layered over the theme
    pub user_css: Option<String>,
    /// Enable GitHub Flavored Markdown tables
    pub tables: bool,
    /// Enable strikethrough syntax (~~text~~)
    pub strikethrough: bool,
    /// Enable autolink URLs and emails
    pub autolink: bool,
    /// Enable task lists (- [ ] and - [x])
    pub tasklist: bool,
    /// Enable superscript (^text^)
    pub superscript: bool,
    /// Enable footnotes
    pub footnotes: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            palette: Palette::default(),
            font_scale: 100,
            highlight_color: HighlightColor::default(),
            user_css: None,
            tables: true,
            strikethrough: true,
            autolink: true,
            tasklist: true,
            superscript: true,
            footnotes: true,
        }
    }
}

impl RenderOptions {
    /// Appearance taken from the user's settings.
    ///
    /// The user stylesheet is not read here; callers that know the themes
    /// directory fill in `user_css`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            theme: settings.theme,
            palette: settings.palette,
            font_scale: settings.font_scale,
            highlight_color: settings.search_highlight_color,
            ..Self::default()
        }
    }

    fn to_comrak_options(&self) -> Options {
        let mut options = Options::default();
        options.extension.strikethrough = self.strikethrough;
        options.extension.table = self.tables;
        options.extension.autolink = self.autolink;
        options.extension.tasklist = self.tasklist;
        options.extension.superscript = self.superscript;
        options.extension.footnotes = self.footnotes;
        options.extension.front_matter_delimiter = Some("---".to_string());
        options
    }
}

/// A rendered markdown document.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// Serialized page, starting with a doctype
    pub html: String,
    /// The page as a tree, ready to mount
    pub tree: DocumentTree,
    pub outline: Vec<HeadingEntry>,
    pub char_count: usize,
    pub word_count: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Number of whitespace-separated words in `text`.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Render markdown source into a full page.
pub fn render_markdown(source: &str, options: &RenderOptions) -> RenderedDocument {
    let css = page_css(
        options.theme,
        options.palette,
        options.font_scale,
        options.highlight_color,
        options.user_css.as_deref(),
    );
    let (mut tree, wrapper) = page::skeleton(&css, options.palette);

    let arena = Arena::new();
    let root = parse_document(&arena, source, &options.to_comrak_options());

    let mut converter = Converter::new(&mut tree);
    converter.convert(root, wrapper);
    let outline = converter.into_outline();

    let html = format!("<!DOCTYPE html>{}", tree.to_html());
    debug!(
        "Rendered {} bytes of markdown into {} nodes, {} headings",
        source.len(),
        tree.len(),
        outline.len()
    );

    RenderedDocument {
        html,
        tree,
        outline,
        char_count: source.chars().count(),
        word_count: count_words(source),
    }
}

/// Read a markdown file, refusing anything larger than `max_bytes`.
pub fn read_markdown(path: &Path, max_bytes: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.len() > max_bytes {
        return Err(Error::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            limit: max_bytes,
        });
    }
    fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read and render a markdown file.
pub fn render_file(path: &Path, options: &RenderOptions, max_bytes: u64) -> Result<RenderedDocument> {
    let source = read_markdown(path, max_bytes)?;
    Ok(render_markdown(&source, options))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
