//! In-document incremental search
//!
//! - `locator`: finds literal matches in a document's text nodes
//! - `highlight`: paints and clears `<mark>` markers in the live document
//! - `navigation`: cyclic cursor over the matches
//! - `scheduler`: deferred, cancellable tasks driven by the session's tick
//! - `assist`: optional backend search over the markdown source
//! - `session`: the controller tying it all together

pub mod assist;
pub mod highlight;
pub mod locator;
pub mod navigation;
pub mod scheduler;
pub mod session;

pub use assist::{AssistMatch, AssistResult, SearchAssist, SourceSearchAssist};
pub use highlight::{PaintReport, ScrollOutcome, CURRENT_ATTR, CURRENT_CLASS, MARKER_CLASS, MARKER_TAG};
pub use locator::{locate, MatchSpan, SearchQuery, SearchResultSet};
pub use navigation::{advance, Direction, NavigationState};
pub use scheduler::{Scheduler, TaskHandle};
pub use session::{SearchSession, SearchStatus, SessionState, DEFAULT_DEBOUNCE};
