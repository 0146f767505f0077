//! Preview stylesheet generation for mdr
//!
//! The rendered page carries a single `<style>` element built from the base
//! layout, the selected theme, the palette override, and the colors used for
//! search markers. The theme enums themselves live in `config::settings`
//! so they can be persisted alongside the rest of the user preferences.
//! User stylesheets from the themes directory are handled in `user`.

mod user;

pub use user::{
    get_themes_dir, list_themes_in, load_theme_css_from, normalize_theme_name, theme_file_in,
    themes_dir_for, DEFAULT_CSS_THEME,
};

use crate::config::{HighlightColor, Palette, Theme};
use crate::search::{CURRENT_CLASS, MARKER_CLASS};

/// Smallest font scale (percent) the page will render at.
pub const MIN_FONT_SCALE: u16 = 50;

/// Largest font scale (percent) the page will render at.
pub const MAX_FONT_SCALE: u16 = 200;

// ─────────────────────────────────────────────────────────────────────────────
// Theme CSS
// ─────────────────────────────────────────────────────────────────────────────

const LIGHT_THEME_CSS: &str = "html,body{background:#ffffff;color:#1f2328}a{color:#0969da}\
pre,code{background:#f6f8fa}blockquote{color:#57606a;border-left:4px solid #d0d7de}\
hr{border:0;border-top:1px solid #d0d7de}table{border-collapse:collapse}\
th,td{border:1px solid #d0d7de;padding:6px 10px}";

const DARK_THEME_CSS: &str = "html,body{background:#0d1117;color:#c9d1d9}a{color:#58a6ff}\
pre,code{background:#161b22}blockquote{color:#8b949e;border-left:4px solid #30363d}\
hr{border:0;border-top:1px solid #30363d}table{border-collapse:collapse}\
th,td{border:1px solid #30363d;padding:6px 10px}";

/// CSS for the base theme.
pub fn theme_css(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => LIGHT_THEME_CSS,
        Theme::Dark => DARK_THEME_CSS,
    }
}

/// CSS for the palette override.
///
/// The palette pins content colors under `#wrapper` regardless of what the
/// theme sets; `Palette::Theme` defers to the theme entirely.
pub fn palette_css(palette: Palette) -> String {
    let (bg, fg, link, code_bg, quote, rule) = match palette {
        Palette::Theme => return String::new(),
        Palette::Light => (
            "#ffffff", "#1f2328", "#0969da", "#f6f8fa", "#57606a", "#d0d7de",
        ),
        Palette::Dark => (
            "#0d1117", "#c9d1d9", "#58a6ff", "#161b22", "#8b949e", "#30363d",
        ),
    };

    format!(
        "html,body{{background:{bg};color:{fg}}}#wrapper{{color:{fg}}}\
#wrapper p,#wrapper td,#wrapper div,#wrapper li,#wrapper h1,#wrapper h2,#wrapper h3,\
#wrapper h4,#wrapper h5,#wrapper h6,#wrapper th,#wrapper dt,#wrapper dd,#wrapper span{{color:inherit}}\
#wrapper a{{color:{link}}}#wrapper pre,#wrapper code{{background:{code_bg}}}\
#wrapper blockquote{{color:{quote};border-left:4px solid {rule}}}\
#wrapper hr{{border:0;border-top:1px solid {rule}}}\
#wrapper th,#wrapper td{{border:1px solid {rule};padding:6px 10px}}"
    )
}

/// CSS for search markers.
pub fn marker_css(color: HighlightColor) -> String {
    let (fill, current) = color.css_colors();
    format!(
        "mark.{marker}{{background:{fill};color:inherit;border-radius:2px}}\
mark.{current_class}{{background:{current};outline:2px solid {current}}}",
        marker = MARKER_CLASS,
        current_class = CURRENT_CLASS,
    )
}

/// Base layout CSS with the font scale applied.
pub fn base_css(font_scale: u16) -> String {
    let scale = font_scale.clamp(MIN_FONT_SCALE, MAX_FONT_SCALE);
    format!(
        "body{{margin:0}}img{{max-width:100%}}pre{{overflow:auto}}\
#wrapper{{font-size:{scale}% !important;padding:32px;max-width:900px;margin:0 auto;\
font-family:-apple-system,BlinkMacSystemFont,Segoe UI,Roboto,Helvetica Neue,Arial,sans-serif;\
line-height:1.55}}pre{{padding:12px;border-radius:8px}}code{{padding:2px 4px;border-radius:6px}}\
blockquote{{margin:0 0 16px 0;padding:0 0 0 14px}}table{{width:100%}}"
    )
}

/// Complete stylesheet for a rendered page.
///
/// A user stylesheet goes after the built-in theme so it can override it;
/// the palette still pins content colors over both.
pub fn page_css(
    theme: Theme,
    palette: Palette,
    font_scale: u16,
    highlight: HighlightColor,
    user_css: Option<&str>,
) -> String {
    let mut css = base_css(font_scale);
    css.push_str(theme_css(theme));
    if let Some(user_css) = user_css {
        css.push_str(user_css);
    }
    css.push_str(&palette_css(palette));
    css.push_str(&marker_css(highlight));
    css
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
