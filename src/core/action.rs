//! # Actions
//!
//! Everything that can change which screen is live becomes an `Action`.
//! The user activates a button? The screen turns the `Intent` into an action.
//! A background load finishes? It sends `Action::Refresh` through the
//! [`Dispatcher`], stamped with the token of the activation that started it.
//!
//! ```text
//! Screen / background task ──Dispatch{origin, action}──▶ UI loop ──▶ NavigationController
//! ```
//!
//! A dispatch whose origin token has been cancelled is stale and is dropped
//! by the UI loop without side effects.

use std::sync::mpsc;

use chrono::Local;
use log::{debug, warn};

use crate::core::model::{Task, TaskList, TaskStatus};
use crate::core::token::ActivationToken;
use crate::store::{Filter, Query, Relation, SortKey, SortOrder};

/// Which screen to build. Screens are constructed by the application from
/// these descriptions; the navigation controller works with the instances.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenRequest {
    Home,
    Navigation,
    TaskLists,
    ListOfTasks {
        title: String,
        task_list: Option<TaskList>,
        query: Query,
    },
    Task(Task),
    MutateTask {
        task: Option<Task>,
        task_list: Option<TaskList>,
    },
    MutateTaskList(Option<TaskList>),
}

impl ScreenRequest {
    pub fn tasks_in_list(list: &TaskList) -> Self {
        ScreenRequest::ListOfTasks {
            title: list.label.clone(),
            task_list: Some(list.clone()),
            query: Query::new()
                .filter(Filter::TaskList(list.id))
                .sort(SortKey::Order, SortOrder::Asc),
        }
    }

    /// Tasks due today (local time), soonest first.
    pub fn todays_tasks() -> Self {
        ScreenRequest::ListOfTasks {
            title: "Today's Tasks".to_string(),
            task_list: None,
            query: Query::new()
                .preload(Relation::TaskList)
                .sort(SortKey::DueDate, SortOrder::Asc)
                .sort(SortKey::Id, SortOrder::Asc)
                .filter(Filter::DueOn(Local::now().date_naive())),
        }
    }

    pub fn todo_tasks() -> Self {
        ScreenRequest::ListOfTasks {
            title: "Todo Tasks".to_string(),
            task_list: None,
            query: Query::new()
                .preload(Relation::TaskList)
                .sort(SortKey::DueDate, SortOrder::Asc)
                .sort(SortKey::Id, SortOrder::Asc)
                .filter(Filter::Status(vec![TaskStatus::Todo])),
        }
    }

    pub fn done_tasks() -> Self {
        ScreenRequest::ListOfTasks {
            title: "Done Tasks".to_string(),
            task_list: None,
            query: Query::new()
                .preload(Relation::TaskList)
                .sort(SortKey::DueDate, SortOrder::Asc)
                .sort(SortKey::Id, SortOrder::Asc)
                .filter(Filter::Status(vec![TaskStatus::Skip, TaskStatus::Done])),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Show(ScreenRequest),
    GoBack,
    /// Re-present the current screen from its latest view state.
    Refresh,
    /// Close the focused child screen.
    CloseChild,
    Quit,
}

/// An action plus the activation it came from (`None` for host/UI events).
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub origin: Option<ActivationToken>,
    pub action: Action,
}

impl Dispatch {
    pub fn new(action: Action) -> Self {
        Self {
            origin: None,
            action,
        }
    }

    pub fn from_activation(token: &ActivationToken, action: Action) -> Self {
        Self {
            origin: Some(token.clone()),
            action,
        }
    }

    /// True when the originating activation has ended.
    pub fn is_stale(&self) -> bool {
        self.origin.as_ref().is_some_and(ActivationToken::is_cancelled)
    }
}

/// Sending half of the UI loop's action channel.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Dispatch>,
}

impl Dispatcher {
    pub fn new(tx: mpsc::Sender<Dispatch>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::Receiver<Dispatch>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    /// Sends an action not tied to any activation.
    pub fn send(&self, action: Action) {
        if self.tx.send(Dispatch::new(action)).is_err() {
            warn!("Failed to send action: receiver dropped");
        }
    }

    /// Sends `action` only if `token` is still live. Returns whether it was sent.
    pub fn send_gated(&self, token: &ActivationToken, action: Action) -> bool {
        if token.is_cancelled() {
            debug!("Dropping {:?}: activation {} ended", action, token.generation());
            return false;
        }
        if self.tx.send(Dispatch::from_activation(token, action)).is_err() {
            warn!("Failed to send action: receiver dropped");
            return false;
        }
        true
    }
}
