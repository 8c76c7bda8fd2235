//! # Navigation Controller
//!
//! Owns which screen is current, remembers exactly one previous screen, and
//! pushes every newly shown screen's content to the [`Renderer`].
//!
//! ```text
//! show(B):    A (Foreground)            →  A (Background), previous = A
//!                                          B (Foreground), current  = B
//!                                          renderer.present(B's content)
//!
//! go_back():  show(previous), or show(fallback) when there is none
//! ```
//!
//! History is a single slot: after A → B → C, `go_back` shows B, and a second
//! `go_back` shows C again.
//!
//! All operations take one mutex, so transitions are serialized and the
//! renderer sees presentations in the order the transitions happened.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info};
use thiserror::Error;

use crate::core::content::Content;
use crate::core::screen::{Screen, ScreenKind, ScreenState, focus_chain};

/// A broken lifecycle invariant. These are bugs, not user errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("screen '{0}' was already in the foreground when shown")]
    AlreadyForeground(String),
    #[error("screen '{0}' is still in the foreground after being backgrounded")]
    StillForeground(String),
}

/// Everything the renderer needs to draw the current screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Presentation {
    /// Instance id of the current screen.
    pub screen_id: u64,
    pub screen: String,
    pub kind: ScreenKind,
    /// Activation number of the screen this content belongs to.
    pub generation: u64,
    pub content: Content,
    /// Open children, outermost first.
    pub overlays: Vec<Content>,
}

/// Draws whatever the controller presents. Implemented by the TUI.
pub trait Renderer: Send {
    fn present(&mut self, presentation: Presentation);
}

/// Lifecycle notifications from whatever hosts the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Started,
    Stopped,
}

type Fallback = Box<dyn Fn() -> Arc<dyn Screen> + Send + Sync>;

struct NavState {
    current: Option<Arc<dyn Screen>>,
    previous: Option<Arc<dyn Screen>>,
    renderer: Box<dyn Renderer>,
}

pub struct NavigationController {
    state: Mutex<NavState>,
    fallback: Fallback,
}

impl NavigationController {
    /// `fallback` builds the screen `go_back` shows when there is no previous
    /// screen (normally the home screen).
    pub fn new(
        renderer: Box<dyn Renderer>,
        fallback: impl Fn() -> Arc<dyn Screen> + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Mutex::new(NavState {
                current: None,
                previous: None,
                renderer,
            }),
            fallback: Box::new(fallback),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NavState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<Arc<dyn Screen>> {
        self.lock().current.clone()
    }

    pub fn previous(&self) -> Option<Arc<dyn Screen>> {
        self.lock().previous.clone()
    }

    /// The screen receiving input: the deepest open child of the current
    /// screen, or the current screen itself.
    pub fn focused(&self) -> Option<Arc<dyn Screen>> {
        let current = self.current()?;
        focus_chain(&current).pop()
    }

    /// Makes `screen` current. The outgoing screen is backgrounded first and
    /// becomes `previous`.
    pub fn show(&self, screen: Arc<dyn Screen>) -> Result<(), NavigationError> {
        let mut nav = self.lock();
        Self::show_locked(&mut nav, screen)
    }

    /// Shows the previous screen, or the fallback when there is none.
    pub fn go_back(&self) -> Result<(), NavigationError> {
        let mut nav = self.lock();
        let target = match nav.previous.clone() {
            Some(previous) => previous,
            None => {
                debug!("No previous screen, showing fallback");
                (self.fallback)()
            }
        };
        info!("Going back to {}", target.name());
        Self::show_locked(&mut nav, target)
    }

    /// Re-presents the current screen from its latest state. Returns `false`
    /// when there is nothing live to present.
    pub fn refresh(&self) -> bool {
        let mut nav = self.lock();
        let Some(current) = nav.current.clone() else {
            return false;
        };
        if current.state() != ScreenState::Foreground {
            debug!("Not refreshing {}: in background", current.name());
            return false;
        }
        let presentation = Self::presentation(&current, current.content());
        nav.renderer.present(presentation);
        true
    }

    /// Backgrounds the current screen, cancelling its work. Returns whether
    /// anything was live.
    pub fn shutdown(&self) -> bool {
        let nav = self.lock();
        match &nav.current {
            Some(current) => {
                info!("Backgrounding {} on shutdown", current.name());
                current.background()
            }
            None => false,
        }
    }

    pub fn on_host_event(&self, event: HostEvent) {
        match event {
            HostEvent::Started => info!("Host started"),
            HostEvent::Stopped => {
                info!("Host stopped");
                self.shutdown();
            }
        }
    }

    fn show_locked(nav: &mut NavState, screen: Arc<dyn Screen>) -> Result<(), NavigationError> {
        if let Some(outgoing) = nav.current.take() {
            info!("Navigating: {} -> {}", outgoing.name(), screen.name());
            outgoing.background();
            if outgoing.state() != ScreenState::Background {
                error!("{} did not leave the foreground", outgoing.name());
                let name = outgoing.name().to_string();
                nav.current = Some(outgoing);
                return Err(NavigationError::StillForeground(name));
            }
            nav.previous = Some(outgoing);
        } else {
            info!("Showing {}", screen.name());
        }

        let Some(content) = screen.foreground() else {
            error!("{} was already in the foreground", screen.name());
            let name = screen.name().to_string();
            nav.current = Some(screen);
            return Err(NavigationError::AlreadyForeground(name));
        };
        nav.current = Some(screen.clone());
        let presentation = Self::presentation(&screen, content);
        nav.renderer.present(presentation);
        Ok(())
    }

    fn presentation(screen: &Arc<dyn Screen>, content: Content) -> Presentation {
        let overlays = focus_chain(screen)
            .iter()
            .skip(1)
            .map(|child| child.content())
            .collect();
        Presentation {
            screen_id: screen.id(),
            screen: screen.name().to_string(),
            kind: screen.kind(),
            generation: screen.token().map(|t| t.generation()).unwrap_or_default(),
            content,
            overlays,
        }
    }
}
