//! User stylesheets from the themes directory
//!
//! Every `<name>.css` file in `<config dir>/mdthemes` is a selectable theme.
//! The active one is layered over the built-in theme CSS; the name
//! `default` selects no stylesheet at all.

use crate::config::get_config_dir;
use crate::error::Result;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Theme name meaning "no user stylesheet".
pub const DEFAULT_CSS_THEME: &str = "default";

/// Directory name for user stylesheets, next to the config file.
const THEMES_DIR_NAME: &str = "mdthemes";

/// The platform themes directory.
pub fn get_themes_dir() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(THEMES_DIR_NAME))
}

/// Themes directory belonging to an explicit config file.
pub fn themes_dir_for(config_file: &Path) -> PathBuf {
    config_file
        .parent()
        .map(|dir| dir.join(THEMES_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(THEMES_DIR_NAME))
}

/// Reduce a theme name to a bare file stem.
///
/// Directory components and a `.css` suffix are dropped, so a name can
/// never point outside the themes directory. Empty names become `default`.
pub fn normalize_theme_name(name: &str) -> String {
    let base = Path::new(name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let stem = if base.to_ascii_lowercase().ends_with(".css") {
        &base[..base.len() - 4]
    } else {
        base
    };
    if stem.is_empty() {
        DEFAULT_CSS_THEME.to_string()
    } else {
        stem.to_string()
    }
}

/// Path of the stylesheet for `name`, or `None` for the default theme.
pub fn theme_file_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let name = normalize_theme_name(name);
    if name == DEFAULT_CSS_THEME {
        return None;
    }
    Some(dir.join(format!("{}.css", name)))
}

/// Read the stylesheet for `name`. Missing or unreadable files yield `None`.
pub fn load_theme_css_from(dir: &Path, name: &str) -> Option<String> {
    let path = theme_file_in(dir, name)?;
    match fs::read_to_string(&path) {
        Ok(css) => Some(css),
        Err(e) => {
            debug!("No theme stylesheet at {}: {}", path.display(), e);
            None
        }
    }
}

/// Theme names available in `dir`.
///
/// `default` always comes first, followed by the stem of every `.css` file,
/// sorted and deduplicated.
pub fn list_themes_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| !t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name.to_ascii_lowercase().ends_with(".css"))
            .map(|name| name[..name.len() - 4].to_string())
            .filter(|name| !name.is_empty() && name != DEFAULT_CSS_THEME)
            .collect(),
        Err(e) => {
            debug!("Cannot read themes directory {}: {}", dir.display(), e);
            Vec::new()
        }
    };
    names.sort();
    names.dedup();

    let mut themes = vec![DEFAULT_CSS_THEME.to_string()];
    themes.extend(names);
    themes
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_theme_name() {
        assert_eq!(normalize_theme_name("  github  "), "github");
        assert_eq!(normalize_theme_name("github.CSS"), "github");
        assert_eq!(normalize_theme_name("../../etc/evil.css"), "evil");
        assert_eq!(normalize_theme_name(""), DEFAULT_CSS_THEME);
        assert_eq!(normalize_theme_name(".."), DEFAULT_CSS_THEME);
    }

    #[test]
    fn test_list_themes_sorted_with_default_first() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("zen.css"), "").unwrap();
        fs::write(dir.path().join("academic.css"), "").unwrap();
        fs::write(dir.path().join("default.css"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("folder.css")).unwrap();

        assert_eq!(
            list_themes_in(dir.path()),
            vec!["default", "academic", "zen"]
        );
    }

    #[test]
    fn test_list_themes_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(list_themes_in(&dir.path().join("missing")), vec!["default"]);
    }

    #[test]
    fn test_load_theme_css() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("night.css"), "body{color:red}").unwrap();

        assert_eq!(
            load_theme_css_from(dir.path(), "night").as_deref(),
            Some("body{color:red}")
        );
        assert_eq!(
            load_theme_css_from(dir.path(), "night.css").as_deref(),
            Some("body{color:red}")
        );
        assert_eq!(load_theme_css_from(dir.path(), "default"), None);
        assert_eq!(load_theme_css_from(dir.path(), "missing"), None);
    }

    #[test]
    fn test_themes_dir_for_config_file() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.json");
        assert_eq!(themes_dir_for(&config), dir.path().join("mdthemes"));
    }
}
