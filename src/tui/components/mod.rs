//! # TUI Components
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! - `TitleBar`: top status bar showing the screen title and status
//! - `ChildOverlay`: a child screen drawn centered over the body
//!
//! ### Stateful Components
//!
//! - `ContentView`: scrollable body of content nodes, with its persistent
//!   `ContentViewState` (scroll offset, node heights)
//!
//! Components receive external data as props, never by reaching into the
//! `App`, which keeps them testable against a `TestBackend`.

pub mod content_view;
pub mod overlay;
mod title_bar;

pub use content_view::{ContentView, ContentViewState};
pub use overlay::{ChildOverlay, centered_rect};
pub use title_bar::TitleBar;
