//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, draws whatever the
//! navigation controller presents, and turns keys into intents for the
//! focused screen.
//!
//! This is the only module that knows about ratatui and crossterm. The
//! core talks to it through a single [`Renderer`](crate::core::navigation::Renderer),
//! the [`FrameSlot`].
//!
//! ## Event Loop
//!
//! Each turn of the loop:
//!
//! 1. picks up the latest presentation, if the controller produced one
//! 2. draws, when something changed
//! 3. handles terminal events (keys go to the focused form)
//! 4. drains the action channel fed by background loads
//!
//! While any node shows a loading spinner the loop redraws every ~80ms;
//! otherwise it only redraws on events and new presentations.

mod component;
mod components;
mod event;
mod form;
pub mod markdown;
mod renderer;
mod ui;

use std::io::{self, stdout};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use log::{debug, error, info, warn};
use ratatui::DefaultTerminal;

use crate::core::action::{Action, Dispatch, Dispatcher, ScreenRequest};
use crate::core::config::ResolvedConfig;
use crate::core::content::{Content, Node};
use crate::core::navigation::{NavigationError, Presentation};
use crate::core::state::{App, Flow};
use crate::screens::ScreenContext;
use crate::store::SharedStore;
use crate::tui::component::EventHandler;
use crate::tui::components::ContentViewState;
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};
use crate::tui::form::{FormEvent, FormState};

pub use renderer::FrameSlot;

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    /// What the controller last presented
    pub presentation: Option<Presentation>,
    /// Edits and focus, per layer
    pub form: FormState,
    /// Scroll state of the body
    pub body: ContentViewState,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            presentation: None,
            form: FormState::new(),
            body: ContentViewState::new(),
        }
    }

    /// Takes a new presentation. Scrolling restarts when another screen, or
    /// another activation of the same screen, is shown.
    pub fn show(&mut self, presentation: Presentation) {
        let same_activation = self.presentation.as_ref().is_some_and(|current| {
            current.screen_id == presentation.screen_id && current.generation == presentation.generation
        });
        if !same_activation {
            self.body.reset();
        }
        self.form.sync(&presentation);
        self.presentation = Some(presentation);
    }

    /// Whether a spinner is on screen (and the loop should keep animating).
    pub fn is_loading(&self) -> bool {
        fn has_loading(nodes: &[Node]) -> bool {
            nodes.iter().any(|node| match node {
                Node::Loading(_) => true,
                Node::Row(children) => has_loading(children),
                _ => false,
            })
        }
        self.presentation.as_ref().is_some_and(|p| {
            std::iter::once(&p.content)
                .chain(&p.overlays)
                .any(|content: &Content| has_loading(&content.nodes))
        })
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> io::Result<Self> {
        // The Kitty keyboard protocol is harmlessly ignored by terminals
        // that don't support it
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Hide,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Show
        );
    }
}

/// Runs the UI until the user quits or a shutdown signal arrives.
///
/// Must be called from within a tokio runtime: screens spawn their loads
/// onto it.
pub fn run(config: ResolvedConfig, store: SharedStore) -> io::Result<()> {
    let (dispatcher, rx) = Dispatcher::channel();
    let ctx = ScreenContext::new(store, dispatcher.clone());
    let slot = FrameSlot::default();
    let mut app = App::new(ctx, Box::new(slot.clone()), config.home.request());
    let mut tui = TuiState::new();

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();
    spawn_signal_listener(dispatcher);

    let outcome = event_loop(&mut terminal, &mut app, &mut tui, &slot, &rx);

    // Background the current screen so in-flight loads are cancelled
    app.stop();
    ratatui::restore();
    outcome
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    tui: &mut TuiState,
    slot: &FrameSlot,
    rx: &Receiver<Dispatch>,
) -> io::Result<()> {
    app.start().map_err(fatal)?;

    let start_time = Instant::now();
    let mut needs_redraw = true; // Force first frame

    loop {
        if let Some(presentation) = slot.take() {
            tui.show(presentation);
            needs_redraw = true;
        }

        let animating = tui.is_loading();
        if animating {
            needs_redraw = true;
        }

        // Only draw when something changed
        if needs_redraw {
            let spinner_frame = (start_time.elapsed().as_secs_f32() * 12.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, tui, &app.status_message, spinner_frame))?;
            needs_redraw = false;
        }

        // Short when animating (~12fps); otherwise short enough that
        // finished loads show up promptly
        let timeout = if animating {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(100)
        };
        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }

        // Process first event + drain ALL pending events before next draw
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if handle_event(app, tui, event)? == Flow::Quit {
                return Ok(());
            }
            // The next key must land on whatever the last one brought up
            if let Some(presentation) = slot.take() {
                tui.show(presentation);
            }
        }

        // Results of background loads
        while let Ok(dispatch) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", dispatch.action);
            if app.dispatch(dispatch).map_err(fatal)? == Flow::Quit {
                return Ok(());
            }
        }
    }
}

fn handle_event(app: &mut App, tui: &mut TuiState, event: TuiEvent) -> io::Result<Flow> {
    let result = match event {
        // Resize just needs a redraw (already flagged)
        TuiEvent::Resize => Ok(Flow::Continue),
        TuiEvent::ForceQuit => app.dispatch(Dispatch::new(Action::Quit)),
        TuiEvent::Escape => app.escape(),
        TuiEvent::OpenMenu => app.dispatch(Dispatch::new(Action::Show(ScreenRequest::Navigation))),
        TuiEvent::ScrollUp
        | TuiEvent::ScrollDown
        | TuiEvent::ScrollPageUp
        | TuiEvent::ScrollPageDown => {
            tui.body.handle_event(&event);
            Ok(Flow::Continue)
        }
        _ => {
            let form_event = tui.form.handle_event(&event);
            if form_event == Some(FormEvent::FocusMoved) {
                tui.body.handle_event(&event);
            }
            match form_event {
                Some(FormEvent::Activate(intent)) => {
                    debug!("Activating {:?}", intent);
                    let input = tui.form.input();
                    app.handle_intent(intent, &input)
                }
                _ => Ok(Flow::Continue),
            }
        }
    };
    result.map_err(fatal)
}

/// Navigation errors mean the screen state machine is broken; there is no
/// sensible way to keep going.
fn fatal(e: NavigationError) -> io::Error {
    error!("Navigation failed: {}", e);
    io::Error::other(e)
}

fn spawn_signal_listener(dispatcher: Dispatcher) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        dispatcher.send(Action::Quit);
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::Intent;
    use crate::core::screen::ScreenKind;
    use crate::test_support::test_context;

    fn presentation(screen: &str, generation: u64, nodes: Vec<Node>) -> Presentation {
        let mut content = Content::new(screen);
        content.nodes = nodes;
        Presentation {
            screen_id: 1,
            screen: screen.into(),
            kind: ScreenKind::Custom,
            generation,
            content,
            overlays: Vec::new(),
        }
    }

    #[test]
    fn test_is_loading_looks_inside_rows() {
        let mut tui = TuiState::new();
        assert!(!tui.is_loading());
        tui.show(presentation(
            "Lists",
            1,
            vec![Node::Row(vec![Node::Loading("Loading...".into())])],
        ));
        assert!(tui.is_loading());
        tui.show(presentation("Lists", 1, vec![Node::text("done")]));
        assert!(!tui.is_loading());
    }

    #[test]
    fn test_new_activation_resets_scroll() {
        let mut tui = TuiState::new();
        tui.show(presentation("Lists", 1, Vec::new()));
        tui.body.follow_focus = true;
        tui.show(presentation("Lists", 1, Vec::new()));
        assert!(tui.body.follow_focus);
        tui.show(presentation("Lists", 2, Vec::new()));
        assert!(!tui.body.follow_focus);
    }

    #[tokio::test]
    async fn test_keys_drive_navigation() {
        let (ctx, _rx) = test_context();
        let slot = FrameSlot::default();
        let mut app = App::new(ctx, Box::new(slot.clone()), ScreenRequest::Navigation);
        let mut tui = TuiState::new();
        app.start().unwrap();
        tui.show(slot.take().unwrap());

        // First button of the menu is "Home"
        assert_eq!(
            handle_event(&mut app, &mut tui, TuiEvent::Submit).unwrap(),
            Flow::Continue
        );
        tui.show(slot.take().unwrap());
        assert_eq!(app.focused().unwrap().kind(), ScreenKind::Home);

        handle_event(&mut app, &mut tui, TuiEvent::OpenMenu).unwrap();
        tui.show(slot.take().unwrap());
        assert_eq!(app.focused().unwrap().kind(), ScreenKind::Navigation);

        handle_event(&mut app, &mut tui, TuiEvent::Escape).unwrap();
        assert_eq!(app.focused().unwrap().kind(), ScreenKind::Home);

        assert_eq!(
            handle_event(&mut app, &mut tui, TuiEvent::ForceQuit).unwrap(),
            Flow::Quit
        );
    }

    #[tokio::test]
    async fn test_typed_text_reaches_the_screen() {
        let (ctx, _rx) = test_context();
        let slot = FrameSlot::default();
        let mut app = App::new(ctx, Box::new(slot.clone()), ScreenRequest::MutateTaskList(None));
        let mut tui = TuiState::new();
        app.start().unwrap();
        tui.show(slot.take().unwrap());

        // Save with an empty name is refused inline
        let save = tui.presentation.as_ref().unwrap().content.focusable().iter().position(
            |node| matches!(node, Node::Button { intent: Intent::Save, .. }),
        );
        let save = save.unwrap();
        for _ in 0..save {
            handle_event(&mut app, &mut tui, TuiEvent::FocusNext).unwrap();
        }
        handle_event(&mut app, &mut tui, TuiEvent::Submit).unwrap();
        tui.show(slot.take().unwrap());
        assert_eq!(
            tui.presentation.as_ref().unwrap().content.error.as_deref(),
            Some("Name is required")
        );
        assert_eq!(tui.form.top().unwrap().focus(), save);
    }
}
