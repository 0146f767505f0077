//! Main application module for mdr
//!
//! `Previewer` owns everything a preview window needs: settings, the frame
//! hosting the rendered page, the search session, and the file watcher.
//! Every re-render (file change, theme, palette, font scale, marker color)
//! goes through the same mount/load cycle so the search session can
//! reconcile against the new document. Edits to the active user stylesheet
//! take the same path.

use crate::config::{save_config_silent, save_config_to, HighlightColor, Palette, Settings, Theme};
use crate::error::{Error, Result};
use crate::preview::{DocumentHost, LoadState, PreviewFrame, ScrollAlign};
use crate::render::{read_markdown, render_markdown, HeadingEntry, RenderOptions};
use crate::search::{Direction, SearchSession, SearchStatus, SourceSearchAssist};
use crate::theme::{
    get_themes_dir, list_themes_in, load_theme_css_from, normalize_theme_name, theme_file_in,
    themes_dir_for, DEFAULT_CSS_THEME,
};
use crate::watcher::{FileEvent, FileWatcher};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Upper bound on tasks run by a single `run_pending` call.
const MAX_PENDING_STEPS: usize = 64;

/// A markdown preview with in-document search.
#[derive(Debug)]
pub struct Previewer {
    settings: Settings,
    /// Explicit config file; `None` uses the platform location
    config_path: Option<PathBuf>,
    frame: PreviewFrame,
    session: SearchSession,
    path: Option<PathBuf>,
    source: String,
    outline: Vec<HeadingEntry>,
    char_count: usize,
    word_count: usize,
    watcher: Option<FileWatcher>,
    /// Watches the active user stylesheet while file watching is on
    theme_watcher: Option<FileWatcher>,
}

impl Previewer {
    /// Create a previewer with no document open.
    pub fn new(mut settings: Settings) -> Self {
        settings.sanitize();

        let mut frame = PreviewFrame::new();
        let mut session = SearchSession::new(settings.search_debounce())
            .with_assist(Box::new(SourceSearchAssist::new()));
        session.set_case_sensitive(settings.search_case_sensitive, Instant::now(), &mut frame);

        Self {
            settings,
            config_path: None,
            frame,
            session,
            path: None,
            source: String::new(),
            outline: Vec::new(),
            char_count: 0,
            word_count: 0,
            watcher: None,
            theme_watcher: None,
        }
    }

    /// Persist settings changes to `path` instead of the platform location.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The open document, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn outline(&self) -> &[HeadingEntry] {
        &self.outline
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// The live page including any search markers.
    pub fn html(&self) -> Option<String> {
        self.frame.html()
    }

    pub fn frame(&self) -> &PreviewFrame {
        &self.frame
    }

    pub fn search(&self) -> &SearchSession {
        &self.session
    }

    pub fn search_status(&self) -> SearchStatus {
        self.session.status()
    }

    /// When `tick` next has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.frame.load_state() == LoadState::Loading {
            return Some(Instant::now());
        }
        self.session.next_deadline()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Open and render a markdown file.
    pub fn open(&mut self, path: &Path, now: Instant) -> Result<()> {
        let source = read_markdown(path, self.settings.max_file_bytes())?;
        info!("Opening file: {}", path.display());

        if self.path.as_deref() != Some(path) {
            self.watcher = None;
            self.theme_watcher = None;
        }
        self.path = Some(path.to_path_buf());
        self.show(source, now);
        Ok(())
    }

    /// Re-read and re-render the open file.
    pub fn reload(&mut self, now: Instant) -> Result<()> {
        let path = self.path.clone().ok_or(Error::NoDocument)?;
        let source = read_markdown(&path, self.settings.max_file_bytes())?;
        debug!("Reloading {}", path.display());
        self.show(source, now);
        Ok(())
    }

    /// Render `source` and mount it; the frame finishes loading on the next tick.
    fn show(&mut self, source: String, now: Instant) {
        let rendered = render_markdown(&source, &self.render_options());
        if let Some(assist) = self.session.assist_mut() {
            assist.document_changed(&source);
        }

        self.outline = rendered.outline;
        self.char_count = rendered.char_count;
        self.word_count = rendered.word_count;
        self.source = source;

        self.frame.mount(rendered.tree);
        self.session.on_document_replaced(now, &self.frame);
    }

    /// Re-render the current source after an appearance change.
    fn rerender(&mut self, now: Instant) {
        if self.path.is_none() && self.source.is_empty() {
            return;
        }
        let source = self.source.clone();
        self.show(source, now);
    }

    /// Preview markdown that does not come from a file.
    pub fn show_source(&mut self, source: &str, now: Instant) {
        self.watcher = None;
        self.theme_watcher = None;
        self.path = None;
        self.show(source.to_string(), now);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Appearance
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_theme(&mut self, theme: Theme, now: Instant) {
        self.settings.theme = theme;
        self.persist();
        info!("Theme changed to: {:?}", theme);
        self.rerender(now);
    }

    pub fn set_palette(&mut self, palette: Palette, now: Instant) {
        self.settings.palette = palette;
        self.persist();
        info!("Palette changed to: {:?}", palette);
        self.rerender(now);
    }

    pub fn set_font_scale(&mut self, scale: u16, now: Instant) {
        self.settings.font_scale = scale;
        self.settings.sanitize();
        self.persist();
        info!("Font scale changed to: {}%", self.settings.font_scale);
        self.rerender(now);
    }

    pub fn set_highlight_color(&mut self, color: HighlightColor, now: Instant) {
        self.settings.search_highlight_color = color;
        self.persist();
        info!("Highlight color changed to: {:?}", color);
        self.rerender(now);
    }

    /// Switch the user stylesheet. A name without a file renders with none.
    pub fn set_css_theme(&mut self, name: &str, now: Instant) {
        self.settings.css_theme = normalize_theme_name(name);
        self.persist();
        info!("Stylesheet changed to: {}", self.settings.css_theme);
        if self.watcher.is_some() {
            self.refresh_theme_watch();
        }
        self.rerender(now);
    }

    /// Names of the available user stylesheets, `default` first.
    pub fn list_themes(&self) -> Vec<String> {
        match self.themes_dir() {
            Some(dir) => list_themes_in(&dir),
            None => vec![DEFAULT_CSS_THEME.to_string()],
        }
    }

    /// Directory holding user stylesheets, next to the config file in use.
    fn themes_dir(&self) -> Option<PathBuf> {
        match &self.config_path {
            Some(config) => Some(themes_dir_for(config)),
            None => get_themes_dir().ok(),
        }
    }

    fn render_options(&self) -> RenderOptions {
        let mut options = RenderOptions::from_settings(&self.settings);
        options.user_css = self
            .themes_dir()
            .and_then(|dir| load_theme_css_from(&dir, &self.settings.css_theme));
        options
    }

    fn persist(&self) {
        let saved = match &self.config_path {
            Some(path) => match save_config_to(path, &self.settings) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to save settings: {}", e);
                    false
                }
            },
            None => save_config_silent(&self.settings),
        };
        if !saved {
            debug!("Settings not persisted");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // File Watching
    // ─────────────────────────────────────────────────────────────────────────

    /// Watch the open file for external changes.
    pub fn start_watching(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(Error::NoDocument)?;
        self.watcher = Some(FileWatcher::new(&path)?);
        self.refresh_theme_watch();
        Ok(())
    }

    /// Watch the active stylesheet, replacing any previous theme watch.
    fn refresh_theme_watch(&mut self) {
        self.theme_watcher = None;
        let Some(file) = self
            .themes_dir()
            .and_then(|dir| theme_file_in(&dir, &self.settings.css_theme))
        else {
            return;
        };
        if !file.exists() {
            debug!("Stylesheet {} does not exist, not watching", file.display());
            return;
        }
        match FileWatcher::new(&file) {
            Ok(watcher) => self.theme_watcher = Some(watcher),
            Err(e) => warn!("Failed to watch stylesheet: {}", e),
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Handle pending file events. Returns whether the document was reloaded.
    pub fn poll_file_events(&mut self, now: Instant) -> bool {
        let events = self
            .watcher
            .as_ref()
            .map(FileWatcher::poll_events)
            .unwrap_or_default();
        let theme_events = self
            .theme_watcher
            .as_ref()
            .map(FileWatcher::poll_events)
            .unwrap_or_default();

        let mut reloaded = false;
        for event in events {
            match event {
                FileEvent::Changed => {
                    if !self.settings.auto_reload {
                        debug!("File changed, auto-reload disabled");
                        continue;
                    }
                    match self.reload(now) {
                        Ok(()) => reloaded = true,
                        Err(e) => warn!("Failed to reload file: {}", e),
                    }
                }
                FileEvent::Removed => {
                    if let Some(path) = &self.path {
                        warn!("Open file was removed: {}", path.display());
                    }
                }
                FileEvent::Error(msg) => warn!("File watcher error: {}", msg),
            }
        }
        if self.apply_theme_events(theme_events, now) {
            reloaded = true;
        }
        reloaded
    }

    /// Re-render after the active stylesheet changed on disk.
    ///
    /// Returns whether the page was re-rendered.
    fn apply_theme_events(&mut self, events: Vec<FileEvent>, now: Instant) -> bool {
        let mut changed = false;
        for event in events {
            match event {
                FileEvent::Changed | FileEvent::Removed => changed = true,
                FileEvent::Error(msg) => warn!("Stylesheet watcher error: {}", msg),
            }
        }
        if !changed || !self.settings.auto_reload {
            return false;
        }
        info!("Stylesheet {} changed, re-rendering", self.settings.css_theme);
        self.rerender(now);
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Search
    // ─────────────────────────────────────────────────────────────────────────

    pub fn open_search(&mut self) {
        self.session.open(&mut self.frame);
    }

    pub fn close_search(&mut self) {
        self.session.close(&mut self.frame);
    }

    pub fn set_query(&mut self, text: &str, now: Instant) {
        self.session.set_query(text, now);
    }

    /// Toggle case sensitivity and remember the choice.
    pub fn set_case_sensitive(&mut self, case_sensitive: bool, now: Instant) {
        self.session
            .set_case_sensitive(case_sensitive, now, &mut self.frame);
        if self.settings.search_case_sensitive != case_sensitive {
            self.settings.search_case_sensitive = case_sensitive;
            self.persist();
        }
    }

    pub fn navigate(&mut self, direction: Direction, now: Instant) -> bool {
        self.session.navigate(direction, now, &mut self.frame)
    }

    /// Scroll the heading with anchor `id` to the top of the view.
    pub fn scroll_to_heading(&mut self, id: &str) -> bool {
        let Some(node) = self
            .frame
            .document()
            .and_then(|tree| tree.element_by_id(id))
        else {
            debug!("No element #{} in the page", id);
            return false;
        };
        self.frame.scroll_into_view(node, ScrollAlign::Start)
    }

    /// Finish a pending frame load and run due search work.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut ran = false;
        if self.frame.load_state() == LoadState::Loading {
            if let Some(generation) = self.frame.finish_load() {
                debug!("Document generation {} loaded", generation);
                self.session.on_document_loaded(now, &self.frame);
                ran = true;
            }
        }
        self.session.tick(now, &mut self.frame) || ran
    }

    /// Advance time through every pending task, starting at `now`.
    ///
    /// Returns the instant the last task ran at.
    pub fn run_pending(&mut self, now: Instant) -> Instant {
        let mut clock = now;
        for _ in 0..MAX_PENDING_STEPS {
            let due = if self.frame.load_state() == LoadState::Loading {
                Some(clock)
            } else {
                self.session.next_deadline()
            };
            let Some(due) = due else {
                break;
            };
            clock = clock.max(due);
            self.tick(clock);
        }
        clock
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from;
    use crate::search::highlight::{current_marker, markers};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    struct TestEnv {
        dir: TempDir,
        doc: PathBuf,
        config: PathBuf,
    }

    impl TestEnv {
        fn new(content: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let doc = dir.path().join("doc.md");
            let config = dir.path().join("config.json");
            fs::write(&doc, content).unwrap();
            Self { dir, doc, config }
        }

        fn previewer(&self) -> Previewer {
            Previewer::new(Settings::default()).with_config_path(&self.config)
        }
    }

    fn marker_count(previewer: &Previewer) -> usize {
        previewer
            .frame()
            .document()
            .map(|tree| markers(tree).len())
            .unwrap_or(0)
    }

    fn searched(env: &TestEnv, query: &str, start: Instant) -> Previewer {
        let mut previewer = env.previewer();
        previewer.open(&env.doc, start).unwrap();
        previewer.open_search();
        previewer.set_query(query, start);
        previewer.run_pending(start);
        previewer
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Document tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_open_renders_on_next_tick() {
        let env = TestEnv::new("# Title\n\nThe cat sat.\n");
        let mut previewer = env.previewer();
        let start = Instant::now();
        previewer.open(&env.doc, start).unwrap();

        assert!(previewer.html().is_none());
        assert!(previewer.tick(start));
        assert!(previewer.html().unwrap().contains("<h1 id=\"title\">Title</h1>"));
        assert_eq!(previewer.outline().len(), 1);
        assert_eq!(previewer.word_count(), 5);
    }

    #[test]
    fn test_open_missing_file() {
        let env = TestEnv::new("");
        let mut previewer = env.previewer();
        let missing = env.dir.path().join("missing.md");
        assert!(previewer.open(&missing, Instant::now()).is_err());
        assert!(previewer.path().is_none());
    }

    #[test]
    fn test_reload_without_document() {
        let env = TestEnv::new("");
        let mut previewer = env.previewer();
        assert!(matches!(previewer.reload(Instant::now()), Err(Error::NoDocument)));
        assert!(matches!(previewer.start_watching(), Err(Error::NoDocument)));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Search tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_search_highlights_page() {
        let env = TestEnv::new("The cat sat. The **CAT** ran.\n\n```\ncat file\n```\n");
        let start = Instant::now();
        let previewer = searched(&env, "cat", start);

        let status = previewer.search_status();
        assert_eq!(status.label, "1 of 2");
        assert_eq!(marker_count(&previewer), 2);
        let html = previewer.html().unwrap();
        assert!(html.contains("<pre><code>cat file\n</code></pre>"));
        assert!(html.contains("data-current=\"true\">cat</mark>"));
    }

    #[test]
    fn test_rerender_preserves_search_position() {
        let env = TestEnv::new("cat one. cat two. cat three.");
        let start = Instant::now();
        let mut previewer = searched(&env, "cat", start);
        previewer.navigate(Direction::Next, start + Duration::from_millis(500));
        assert_eq!(previewer.search_status().label, "2 of 3");

        let later = start + Duration::from_secs(1);
        previewer.set_theme(Theme::Dark, later);
        assert_eq!(previewer.search_status().label, "2 of 3");
        previewer.run_pending(later);

        assert_eq!(previewer.search_status().label, "2 of 3");
        assert_eq!(marker_count(&previewer), 3);
        let html = previewer.html().unwrap();
        assert!(html.contains("#0d1117"));
        let tree = previewer.frame().document().unwrap();
        let current = current_marker(tree).unwrap();
        assert_eq!(previewer.frame().scroll_target(), Some(current));
    }

    #[test]
    fn test_reload_after_file_change() {
        let env = TestEnv::new("cat");
        let start = Instant::now();
        let mut previewer = searched(&env, "cat", start);
        assert_eq!(previewer.search_status().total, 1);

        fs::write(&env.doc, "cat cat").unwrap();
        let later = start + Duration::from_secs(1);
        previewer.reload(later).unwrap();
        previewer.run_pending(later);

        assert_eq!(previewer.search_status().label, "1 of 2");
        assert_eq!(previewer.word_count(), 2);
    }

    #[test]
    fn test_case_sensitivity_is_persisted() {
        let env = TestEnv::new("The cat sat. The CAT ran.");
        let start = Instant::now();
        let mut previewer = searched(&env, "cat", start);
        assert_eq!(previewer.search_status().total, 2);

        previewer.set_case_sensitive(true, start + Duration::from_millis(500));
        assert_eq!(previewer.search_status().total, 1);

        let saved = load_config_from(&env.config).unwrap();
        assert!(saved.search_case_sensitive);
    }

    #[test]
    fn test_case_preference_applies_at_startup() {
        let env = TestEnv::new("The cat sat. The CAT ran.");
        let settings = Settings {
            search_case_sensitive: true,
            ..Settings::default()
        };
        let start = Instant::now();
        let mut previewer = Previewer::new(settings).with_config_path(&env.config);
        previewer.open(&env.doc, start).unwrap();
        previewer.open_search();
        previewer.set_query("cat", start);
        previewer.run_pending(start);

        assert_eq!(previewer.search_status().total, 1);
    }

    #[test]
    fn test_close_search_removes_markers() {
        let env = TestEnv::new("The cat sat.");
        let start = Instant::now();
        let mut previewer = searched(&env, "cat", start);
        previewer.close_search();

        assert_eq!(marker_count(&previewer), 0);
        assert_eq!(previewer.search_status().label, "");
        assert!(!previewer.html().unwrap().contains("<mark"));
    }

    #[test]
    fn test_font_scale_is_clamped_and_saved() {
        let env = TestEnv::new("x");
        let mut previewer = env.previewer();
        previewer.open(&env.doc, Instant::now()).unwrap();
        previewer.set_font_scale(900, Instant::now());
        previewer.run_pending(Instant::now());

        assert_eq!(previewer.settings().font_scale, 200);
        assert!(previewer.html().unwrap().contains("font-size:200%"));
        assert_eq!(load_config_from(&env.config).unwrap().font_scale, 200);
    }

    #[test]
    fn test_show_source() {
        let env = TestEnv::new("");
        let mut previewer = env.previewer();
        let start = Instant::now();
        previewer.show_source("## Notes\n\nplain text", start);
        previewer.run_pending(start);

        assert!(previewer.path().is_none());
        assert_eq!(previewer.outline()[0].id, "notes");
    }

    #[test]
    fn test_poll_without_watcher() {
        let env = TestEnv::new("x");
        let mut previewer = env.previewer();
        assert!(!previewer.poll_file_events(Instant::now()));
        assert!(!previewer.is_watching());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stylesheet tests
    // ─────────────────────────────────────────────────────────────────────────

    fn write_theme(env: &TestEnv, name: &str, css: &str) -> PathBuf {
        let dir = env.dir.path().join("mdthemes");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.css", name));
        fs::write(&path, css).unwrap();
        path
    }

    #[test]
    fn test_list_themes_next_to_config() {
        let env = TestEnv::new("x");
        write_theme(&env, "night", "");
        write_theme(&env, "academic", "");
        assert_eq!(env.previewer().list_themes(), vec!["default", "academic", "night"]);
    }

    #[test]
    fn test_css_theme_applies_and_keeps_search() {
        let env = TestEnv::new("cat one. cat two.");
        write_theme(&env, "night", "p{color:#123456}");
        let start = Instant::now();
        let mut previewer = searched(&env, "cat", start);
        previewer.navigate(Direction::Next, start + Duration::from_millis(500));

        let later = start + Duration::from_secs(1);
        previewer.set_css_theme("night", later);
        previewer.run_pending(later);

        assert!(previewer.html().unwrap().contains("p{color:#123456}"));
        assert_eq!(previewer.search_status().label, "2 of 2");
        assert_eq!(marker_count(&previewer), 2);
        assert_eq!(load_config_from(&env.config).unwrap().css_theme, "night");
    }

    #[test]
    fn test_stylesheet_change_rerenders_and_reconciles() {
        let env = TestEnv::new("cat and cat");
        let path = write_theme(&env, "night", "h1{color:red}");
        let start = Instant::now();
        let mut previewer = searched(&env, "cat", start);
        previewer.set_css_theme("night", start);
        previewer.run_pending(start);

        fs::write(&path, "h1{color:blue}").unwrap();
        let later = start + Duration::from_secs(1);
        assert!(previewer.apply_theme_events(vec![FileEvent::Changed], later));
        previewer.run_pending(later);

        let html = previewer.html().unwrap();
        assert!(html.contains("h1{color:blue}"));
        assert!(!html.contains("h1{color:red}"));
        assert_eq!(previewer.search_status().label, "1 of 2");
        assert_eq!(marker_count(&previewer), 2);
    }

    #[test]
    fn test_stylesheet_change_ignored_without_auto_reload() {
        let env = TestEnv::new("x");
        let settings = Settings {
            auto_reload: false,
            ..Settings::default()
        };
        let mut previewer = Previewer::new(settings).with_config_path(&env.config);
        previewer.open(&env.doc, Instant::now()).unwrap();
        assert!(!previewer.apply_theme_events(vec![FileEvent::Changed], Instant::now()));
    }

    #[test]
    fn test_watching_covers_active_stylesheet() {
        let env = TestEnv::new("x");
        write_theme(&env, "night", "");
        let mut previewer = env.previewer();
        previewer.open(&env.doc, Instant::now()).unwrap();
        previewer.start_watching().unwrap();
        assert!(previewer.theme_watcher.is_none());

        previewer.set_css_theme("night", Instant::now());
        assert!(previewer.theme_watcher.is_some());

        previewer.set_css_theme("default", Instant::now());
        assert!(previewer.theme_watcher.is_none());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outline tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_scroll_to_heading() {
        let env = TestEnv::new("# Intro\n\ntext\n\n## Usage\n");
        let mut previewer = env.previewer();
        let start = Instant::now();
        previewer.open(&env.doc, start).unwrap();
        previewer.run_pending(start);

        assert!(previewer.scroll_to_heading("usage"));
        let tree = previewer.frame().document().unwrap();
        assert_eq!(previewer.frame().scroll_target(), tree.element_by_id("usage"));
        assert!(!previewer.scroll_to_heading("missing"));
    }
}
