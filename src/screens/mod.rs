//! # Screens
//!
//! Every concrete screen of the application. Each one holds a
//! [`Lifecycle`] and implements [`ScreenView`]; see `core::screen` for the
//! state machine they share.
//!
//! Screens are built from a [`ScreenRequest`] by [`build`]. Data loads and
//! store mutations are spawned with [`spawn_store_op`], which writes results
//! back through the activation token and asks the UI loop to re-render.

mod confirm;
mod due_date;
mod home;
mod list_of_tasks;
mod mutate_task;
mod mutate_task_list;
mod navigation;
mod task;
mod task_lists;

use std::future::Future;
use std::sync::Arc;

use log::{debug, error};
use tokio::task::JoinHandle;

use crate::core::action::{Action, Dispatcher, ScreenRequest};
use crate::core::screen::{Lifecycle, Screen, ScreenIds, spawn_gated};
use crate::core::token::ActivationToken;
use crate::store::{SharedStore, StoreResult};

pub use confirm::ConfirmScreen;
pub use due_date::{DueDateCell, DueDateScreen};
pub use home::HomeScreen;
pub use list_of_tasks::ListOfTasksScreen;
pub use mutate_task::MutateTaskScreen;
pub use mutate_task_list::MutateTaskListScreen;
pub use navigation::NavigationScreen;
pub use task::TaskScreen;
pub use task_lists::TaskListsScreen;

/// What every screen needs from the outside world.
#[derive(Clone)]
pub struct ScreenContext {
    pub store: SharedStore,
    pub dispatcher: Dispatcher,
    pub ids: ScreenIds,
}

impl ScreenContext {
    pub fn new(store: SharedStore, dispatcher: Dispatcher) -> Self {
        Self {
            store,
            dispatcher,
            ids: ScreenIds::default(),
        }
    }
}

pub fn build(request: &ScreenRequest, ctx: &ScreenContext) -> Arc<dyn Screen> {
    match request {
        ScreenRequest::Home => Arc::new(HomeScreen::new(ctx.clone())),
        ScreenRequest::Navigation => Arc::new(NavigationScreen::new(&ctx.ids)),
        ScreenRequest::TaskLists => Arc::new(TaskListsScreen::new(ctx.clone())),
        ScreenRequest::ListOfTasks {
            title,
            task_list,
            query,
        } => Arc::new(ListOfTasksScreen::new(
            ctx.clone(),
            title.clone(),
            task_list.clone(),
            query.clone(),
        )),
        ScreenRequest::Task(task) => Arc::new(TaskScreen::new(ctx.clone(), task.clone())),
        ScreenRequest::MutateTask { task, task_list } => Arc::new(MutateTaskScreen::new(
            ctx.clone(),
            task.clone(),
            task_list.clone(),
        )),
        ScreenRequest::MutateTaskList(list) => {
            Arc::new(MutateTaskListScreen::new(ctx.clone(), list.clone()))
        }
    }
}

/// State of one asynchronous load as seen by `compose`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Load<T> {
    #[default]
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Load<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Load::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            Load::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<String> {
        match self {
            Load::Failed(e) => Some(e.clone()),
            _ => None,
        }
    }
}

impl<T> From<StoreResult<T>> for Load<T> {
    fn from(result: StoreResult<T>) -> Self {
        match result {
            Ok(value) => Load::Ready(value),
            Err(e) => Load::Failed(e.to_string()),
        }
    }
}

/// Runs a store operation for the activation behind `token` and hands the
/// result to `apply` under the screen lock. `apply` returns the follow-up
/// action (a re-render when `None`). Nothing happens once the activation
/// has ended, and a cancelled query is dropped without a trace.
pub(crate) fn spawn_store_op<V, T, Fut, F>(
    lifecycle: &Arc<Lifecycle<V>>,
    dispatcher: &Dispatcher,
    token: &ActivationToken,
    op: Fut,
    apply: F,
) -> JoinHandle<()>
where
    V: Send + 'static,
    T: Send + 'static,
    Fut: Future<Output = StoreResult<T>> + Send + 'static,
    F: FnOnce(&mut V, StoreResult<T>) -> Option<Action> + Send + 'static,
{
    let lifecycle = lifecycle.clone();
    let dispatcher = dispatcher.clone();
    let gate = token.clone();
    spawn_gated(token, op, move |result| {
        match &result {
            Err(e) if e.is_cancelled() => {
                debug!("[{}] store call cancelled", lifecycle.name());
                return;
            }
            Err(e) => error!("[{}] store call failed: {}", lifecycle.name(), e),
            Ok(_) => {}
        }
        let Some(follow_up) = lifecycle.apply(&gate, |view| apply(view, result)) else {
            return;
        };
        dispatcher.send_gated(&gate, follow_up.unwrap_or(Action::Refresh));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::screen::{ScreenKind, ScreenState};
    use crate::store::StoreError;
    use crate::test_support::test_context;

    #[test]
    fn test_load_from_result() {
        let ok: Load<u32> = Ok(3).into();
        assert_eq!(ok.ready(), Some(&3));
        let failed: Load<u32> = Err(StoreError::Validation("bad".into())).into();
        assert_eq!(failed.error().as_deref(), Some("bad"));
        assert_eq!(Load::<u32>::default(), Load::Pending);
    }

    #[tokio::test]
    async fn test_build_maps_requests_to_kinds() {
        let (ctx, _rx) = test_context();
        let cases = [
            (ScreenRequest::Home, ScreenKind::Home),
            (ScreenRequest::Navigation, ScreenKind::Navigation),
            (ScreenRequest::TaskLists, ScreenKind::TaskLists),
            (ScreenRequest::todo_tasks(), ScreenKind::ListOfTasks),
            (ScreenRequest::MutateTaskList(None), ScreenKind::MutateTaskList),
            (
                ScreenRequest::MutateTask {
                    task: None,
                    task_list: None,
                },
                ScreenKind::MutateTask,
            ),
        ];
        let mut ids = Vec::new();
        for (request, kind) in cases {
            let screen = build(&request, &ctx);
            assert_eq!(screen.kind(), kind);
            assert_eq!(screen.state(), ScreenState::Background);
            ids.push(screen.id());
        }
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[tokio::test]
    async fn test_store_op_result_dropped_after_cancel() {
        let (ctx, rx) = test_context();
        let lifecycle = Arc::new(Lifecycle::new(&ctx.ids, "loader", ScreenKind::Custom, 0u32));
        let (token, _) = lifecycle.enter(|_| ()).unwrap();
        let gate = Arc::new(tokio::sync::Notify::new());
        let wait = gate.clone();

        let handle = spawn_store_op(
            &lifecycle,
            &ctx.dispatcher,
            &token,
            async move {
                wait.notified().await;
                Ok(5u32)
            },
            |view, result| {
                *view = result.unwrap_or_default();
                None
            },
        );
        lifecycle.leave();
        gate.notify_one();
        handle.await.unwrap();

        assert_eq!(lifecycle.with_view(|v| *v), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_store_op_applies_and_requests_refresh() {
        let (ctx, rx) = test_context();
        let lifecycle = Arc::new(Lifecycle::new(&ctx.ids, "loader", ScreenKind::Custom, 0u32));
        let (token, _) = lifecycle.enter(|_| ()).unwrap();

        spawn_store_op(&lifecycle, &ctx.dispatcher, &token, async { Ok(5u32) }, |view, result| {
            *view = result.unwrap_or_default();
            None
        })
        .await
        .unwrap();

        assert_eq!(lifecycle.with_view(|v| *v), 5);
        let dispatch = rx.try_recv().unwrap();
        assert_eq!(dispatch.action, Action::Refresh);
        assert!(dispatch.origin.unwrap().same_activation(&token));
    }
}
