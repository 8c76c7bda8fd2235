//! # Core Application Logic
//!
//! Screen lifecycle and navigation. It knows nothing about any specific UI
//! technology: screens describe their content, a [`navigation::Renderer`]
//! draws it.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │          CORE           │
//!                    │                         │
//!                    │  • Screen lifecycle     │
//!                    │  • NavigationController │
//!                    │  • Actions & tokens     │
//!                    └───────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │    TUI     │      │  Screens   │      │   Store    │
//!     │  Renderer  │      │ (content)  │      │   (JSON)   │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`token`]: `ActivationToken`, the liveness signal of one activation
//! - [`screen`]: the Foreground/Background state machine every screen shares
//! - [`navigation`]: `NavigationController`, current and previous screen
//! - [`content`]: declarative content descriptions and user intents
//! - [`action`]: `Action`, `Dispatch` and the channel back to the UI loop
//! - [`state`]: the `App` that wires it all together
//! - [`model`]: tasks and task lists
//! - [`config`]: layered configuration

pub mod action;
pub mod config;
pub mod content;
pub mod model;
pub mod navigation;
pub mod screen;
pub mod state;
pub mod token;
