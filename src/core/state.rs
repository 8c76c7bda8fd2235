//! # Application State
//!
//! Ties the navigation controller to the screen factory. The UI loop owns
//! the `App` and feeds it two kinds of input: intents from the user, and
//! dispatches from the action channel.
//!
//! ```text
//! App
//! ├── controller: NavigationController   // current + previous screen
//! ├── ctx: ScreenContext                 // store + dispatcher for new screens
//! ├── home: ScreenRequest                // first screen, and go_back fallback
//! └── status_message: String             // status bar text
//! ```

use log::{debug, info};

use crate::core::action::{Action, Dispatch, ScreenRequest};
use crate::core::content::{FormInput, Intent};
use crate::core::navigation::{HostEvent, NavigationController, NavigationError, Renderer};
use crate::core::screen::{Screen, focus_chain};
use crate::screens::{self, ScreenContext};

/// Whether the UI loop should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    controller: NavigationController,
    ctx: ScreenContext,
    home: ScreenRequest,
    pub status_message: String,
}

impl App {
    pub fn new(ctx: ScreenContext, renderer: Box<dyn Renderer>, home: ScreenRequest) -> Self {
        let fallback_ctx = ctx.clone();
        let fallback = home.clone();
        let controller = NavigationController::new(renderer, move || {
            screens::build(&fallback, &fallback_ctx)
        });
        Self {
            controller,
            ctx,
            home,
            status_message: String::from("Welcome to Todo Today!"),
        }
    }

    pub fn controller(&self) -> &NavigationController {
        &self.controller
    }

    /// Shows the home screen.
    pub fn start(&mut self) -> Result<(), NavigationError> {
        self.controller.on_host_event(HostEvent::Started);
        let home = self.home.clone();
        self.open(&home)
    }

    pub fn stop(&mut self) {
        self.controller.on_host_event(HostEvent::Stopped);
    }

    pub fn open(&mut self, request: &ScreenRequest) -> Result<(), NavigationError> {
        let screen = screens::build(request, &self.ctx);
        self.status_message = screen.name().to_string();
        self.controller.show(screen)
    }

    /// The screen receiving input (top child, else the current screen).
    pub fn focused(&self) -> Option<std::sync::Arc<dyn Screen>> {
        self.controller.focused()
    }

    /// Applies one dispatch. Dispatches from ended activations are dropped.
    pub fn dispatch(&mut self, dispatch: Dispatch) -> Result<Flow, NavigationError> {
        if dispatch.is_stale() {
            debug!("Dropping stale {:?}", dispatch.action);
            return Ok(Flow::Continue);
        }
        match dispatch.action {
            Action::Show(request) => self.open(&request)?,
            Action::GoBack => self.controller.go_back()?,
            Action::Refresh => {
                self.controller.refresh();
            }
            Action::CloseChild => self.close_child(),
            Action::Quit => {
                info!("Quit requested");
                self.stop();
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Routes a user intent to the focused screen.
    pub fn handle_intent(&mut self, intent: Intent, input: &FormInput) -> Result<Flow, NavigationError> {
        let Some(screen) = self.focused() else {
            return Ok(Flow::Continue);
        };
        let origin = screen.token();
        match screen.handle(intent, input) {
            Some(action) => self.dispatch(Dispatch { origin, action }),
            None => Ok(Flow::Continue),
        }
    }

    /// Esc: dismiss the top child if there is one, otherwise go back.
    pub fn escape(&mut self) -> Result<Flow, NavigationError> {
        let has_child = self
            .controller
            .current()
            .is_some_and(|current| focus_chain(&current).len() > 1);
        let action = if has_child {
            Action::CloseChild
        } else {
            Action::GoBack
        };
        self.dispatch(Dispatch::new(action))
    }

    fn close_child(&mut self) {
        let Some(current) = self.controller.current() else {
            return;
        };
        let chain = focus_chain(&current);
        if chain.len() < 2 {
            debug!("No child to close");
            return;
        }
        chain[chain.len() - 2].close_child();
        self.controller.refresh();
    }
}
