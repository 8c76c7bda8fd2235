use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use todo_today::core::action::{Action, Dispatch, Dispatcher, ScreenRequest};
use todo_today::core::content::{FormInput, Intent, Node};
use todo_today::core::model::{Task, TaskList, TaskPriority, TaskStatus};
use todo_today::core::navigation::{Presentation, Renderer};
use todo_today::core::screen::{Screen, ScreenKind, ScreenState, same_screen};
use todo_today::core::state::{App, Flow};
use todo_today::core::token::ActivationToken;
use todo_today::screens::ScreenContext;
use todo_today::store::{
    DataStore, EntityKind, JsonStore, Query, Record, SharedStore, StoreResult,
};

// ============================================================================
// Helpers
// ============================================================================

#[derive(Clone, Default)]
struct Recorder {
    presented: Arc<Mutex<Vec<Presentation>>>,
}

impl Recorder {
    fn last(&self) -> Presentation {
        self.presented.lock().unwrap().last().cloned().expect("nothing presented")
    }

    fn count(&self) -> usize {
        self.presented.lock().unwrap().len()
    }
}

impl Renderer for Recorder {
    fn present(&mut self, presentation: Presentation) {
        self.presented.lock().unwrap().push(presentation);
    }
}

/// A store whose queries take a while, so a screen can be left mid-load.
struct SlowStore {
    inner: JsonStore,
    delay: Duration,
}

#[async_trait]
impl DataStore for SlowStore {
    async fn count(&self, kind: EntityKind, query: &Query, token: &ActivationToken) -> StoreResult<u64> {
        tokio::time::sleep(self.delay).await;
        self.inner.count(kind, query, token).await
    }

    async fn find(
        &self,
        kind: EntityKind,
        query: &Query,
        token: &ActivationToken,
    ) -> StoreResult<Vec<Record>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find(kind, query, token).await
    }

    async fn save_task(&self, task: Task) -> StoreResult<Task> {
        self.inner.save_task(task).await
    }

    async fn save_task_list(&self, list: TaskList) -> StoreResult<TaskList> {
        self.inner.save_task_list(list).await
    }

    async fn delete_task(&self, id: u64) -> StoreResult<()> {
        self.inner.delete_task(id).await
    }

    async fn delete_task_list(&self, id: u64) -> StoreResult<()> {
        self.inner.delete_task_list(id).await
    }

    async fn set_task_status(&self, id: u64, status: TaskStatus) -> StoreResult<Task> {
        self.inner.set_task_status(id, status).await
    }

    async fn set_task_priority(&self, id: u64, priority: TaskPriority) -> StoreResult<Task> {
        self.inner.set_task_priority(id, priority).await
    }
}

fn app_with(store: SharedStore) -> (App, Recorder, Receiver<Dispatch>) {
    let (dispatcher, rx) = Dispatcher::channel();
    let recorder = Recorder::default();
    let app = App::new(
        ScreenContext::new(store, dispatcher),
        Box::new(recorder.clone()),
        ScreenRequest::Home,
    );
    (app, recorder, rx)
}

async fn seeded_lists(store: &JsonStore) -> (TaskList, TaskList) {
    let a = store
        .save_task_list(TaskList::draft("Groceries", ""))
        .await
        .unwrap();
    let b = store
        .save_task_list(TaskList::draft("Chores", ""))
        .await
        .unwrap();
    (a, b)
}

/// Applies dispatches until `done` holds or a second passes.
async fn pump_until(app: &mut App, rx: &Receiver<Dispatch>, done: impl Fn(&App) -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !done(app) {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached");
        match rx.try_recv() {
            Ok(dispatch) => {
                app.dispatch(dispatch).unwrap();
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(5)).await,
        }
    }
}

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn test_back_from_list_returns_home() {
    let store = JsonStore::in_memory();
    let (groceries, _) = seeded_lists(&store).await;
    let (mut app, recorder, _rx) = app_with(Arc::new(store));

    app.start().unwrap();
    let home = app.focused().unwrap();
    app.open(&ScreenRequest::tasks_in_list(&groceries)).unwrap();
    assert_eq!(recorder.last().content.title, "Groceries");

    app.dispatch(Dispatch::new(Action::GoBack)).unwrap();
    assert!(same_screen(&app.focused().unwrap(), &home));
    assert_eq!(recorder.last().kind, ScreenKind::Home);
}

#[tokio::test]
async fn test_history_is_a_single_slot() {
    let store = JsonStore::in_memory();
    let (groceries, chores) = seeded_lists(&store).await;
    let (mut app, recorder, _rx) = app_with(Arc::new(store));

    app.start().unwrap();
    app.open(&ScreenRequest::tasks_in_list(&groceries)).unwrap();
    let list_a = app.focused().unwrap();
    app.open(&ScreenRequest::tasks_in_list(&chores)).unwrap();
    let list_b = app.focused().unwrap();

    app.dispatch(Dispatch::new(Action::GoBack)).unwrap();
    assert!(same_screen(&app.focused().unwrap(), &list_a));
    assert_eq!(recorder.last().content.title, "Groceries");

    // Home is gone from history: back again ping-pongs to B
    app.dispatch(Dispatch::new(Action::GoBack)).unwrap();
    assert!(same_screen(&app.focused().unwrap(), &list_b));
    assert_eq!(list_a.state(), ScreenState::Background);
}

#[tokio::test]
async fn test_back_with_no_history_shows_home() {
    let (mut app, recorder, _rx) = app_with(Arc::new(JsonStore::in_memory()));
    app.dispatch(Dispatch::new(Action::GoBack)).unwrap();
    assert_eq!(recorder.last().kind, ScreenKind::Home);
}

#[tokio::test]
async fn test_showing_current_screen_again_reactivates_it() {
    let (mut app, _recorder, _rx) = app_with(Arc::new(JsonStore::in_memory()));
    app.start().unwrap();
    let home = app.focused().unwrap();
    let first = home.token().unwrap();

    app.controller().show(home.clone()).unwrap();

    let second = home.token().unwrap();
    assert!(first.is_cancelled());
    assert!(second.is_live());
    assert_eq!(second.generation(), first.generation() + 1);
    assert!(same_screen(&app.controller().previous().unwrap(), &home));
}

// ============================================================================
// Children and cancellation
// ============================================================================

#[tokio::test]
async fn test_leaving_backgrounds_open_children() {
    let (mut app, recorder, _rx) = app_with(Arc::new(JsonStore::in_memory()));
    app.start().unwrap();
    app.open(&ScreenRequest::MutateTask {
        task: None,
        task_list: None,
    })
    .unwrap();
    app.handle_intent(Intent::PickDueDate, &FormInput::default())
        .unwrap();
    let picker = app.focused().unwrap();
    assert_eq!(picker.kind(), ScreenKind::DueDatePicker);
    let picker_token = picker.token().unwrap();
    assert_eq!(recorder.last().overlays.len(), 1);

    app.dispatch(Dispatch::new(Action::GoBack)).unwrap();
    assert_eq!(picker.state(), ScreenState::Background);
    assert!(picker_token.is_cancelled());
    assert_eq!(app.focused().unwrap().kind(), ScreenKind::Home);
}

#[tokio::test]
async fn test_abandoned_load_is_never_applied() {
    let inner = JsonStore::in_memory();
    seeded_lists(&inner).await;
    let store = Arc::new(SlowStore {
        inner,
        delay: Duration::from_millis(50),
    });
    let (mut app, recorder, rx) = app_with(store);

    app.start().unwrap();
    app.open(&ScreenRequest::TaskLists).unwrap();
    let lists = app.focused().unwrap();
    // Leave before the slow load can finish
    app.open(&ScreenRequest::Navigation).unwrap();
    let presented = recorder.count();

    tokio::time::sleep(Duration::from_millis(200)).await;
    while let Ok(dispatch) = rx.try_recv() {
        assert_eq!(app.dispatch(dispatch).unwrap(), Flow::Continue);
    }

    assert_eq!(recorder.count(), presented);
    assert!(matches!(lists.content().nodes[0], Node::Loading(_)));
    assert_eq!(app.focused().unwrap().kind(), ScreenKind::Navigation);
}

// ============================================================================
// End to end through the screens
// ============================================================================

#[tokio::test]
async fn test_first_list_created_from_home() {
    let store = Arc::new(JsonStore::in_memory());
    let (mut app, recorder, rx) = app_with(store.clone());
    app.start().unwrap();

    // Home with no lists: the primary button opens the list form
    app.handle_intent(Intent::OpenLatestList, &FormInput::default())
        .unwrap();
    pump_until(&mut app, &rx, |app| {
        app.focused().is_some_and(|s| s.kind() == ScreenKind::MutateTaskList)
    })
    .await;

    let mut input = recorder.last().content.form_defaults();
    input.set("label", "Weekend");
    app.handle_intent(Intent::Save, &input).unwrap();
    pump_until(&mut app, &rx, |app| {
        app.focused().is_some_and(|s| s.kind() == ScreenKind::ListOfTasks)
    })
    .await;
    assert_eq!(recorder.last().content.title, "Weekend");

    let lists = store
        .find(EntityKind::TaskList, &Query::new(), &ActivationToken::new(1))
        .await
        .unwrap();
    assert_eq!(lists.len(), 1);
}
