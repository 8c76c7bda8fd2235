//! # Screen Lifecycle
//!
//! A screen is the unit of navigation: a small state machine that is either
//! in the foreground (live, holding an [`ActivationToken`]) or in the
//! background.
//!
//! ```text
//!            foreground()                 background()
//! Background ────────────▶ Foreground ─────────────────▶ Background
//!                          (new token)   (children first, then cancel token)
//! ```
//!
//! Concrete screens don't reimplement this. They hold a [`Lifecycle`] and
//! implement [`ScreenView`]; the blanket impl turns any `ScreenView` into a
//! [`Screen`].
//!
//! ## Locking
//!
//! Each `Lifecycle` has one mutex guarding state, token, children and the
//! screen's view data. `compose` runs under that lock and must not call back
//! into the lifecycle. Async loads are spawned by `activated`, after the lock
//! is released, and write back through [`Lifecycle::apply`], which re-checks
//! the token under the lock.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use tokio::task::JoinHandle;

use crate::core::action::Action;
use crate::core::content::{Content, FormInput, Intent};
use crate::core::token::ActivationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScreenState {
    Foreground,
    #[default]
    Background,
}

/// Tag used wherever behaviour depends on which screen this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    Home,
    Navigation,
    TaskLists,
    ListOfTasks,
    Task,
    MutateTask,
    MutateTaskList,
    DueDatePicker,
    ConfirmDelete,
    Custom,
}

/// The navigation capability every screen exposes.
pub trait Screen: Send + Sync {
    /// Unique per screen instance for the life of the process.
    fn id(&self) -> u64;

    fn name(&self) -> &str;

    fn kind(&self) -> ScreenKind;

    fn state(&self) -> ScreenState;

    /// The live token, present only while in the foreground.
    fn token(&self) -> Option<ActivationToken>;

    /// Enters the foreground and returns the content to show. `None` if the
    /// screen was already in the foreground.
    fn foreground(&self) -> Option<Content>;

    /// Backgrounds children, cancels the token and leaves the foreground.
    /// `false` if the screen was already in the background.
    fn background(&self) -> bool;

    /// The content for the current view state, without a transition.
    fn content(&self) -> Content;

    /// Open child screens in creation order.
    fn children(&self) -> Vec<Arc<dyn Screen>>;

    /// Backgrounds and removes the most recently opened child.
    fn close_child(&self) -> bool;

    /// Reacts to a user intent from this screen's content. Ignored unless
    /// the screen is in the foreground.
    fn handle(&self, intent: Intent, input: &FormInput) -> Option<Action>;
}

impl fmt::Debug for dyn Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("state", &self.state())
            .finish()
    }
}

/// Identity comparison for screen handles.
pub fn same_screen(a: &Arc<dyn Screen>, b: &Arc<dyn Screen>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// `root` followed by its most recent child, that child's most recent child,
/// and so on. The last element is the screen receiving input.
pub fn focus_chain(root: &Arc<dyn Screen>) -> Vec<Arc<dyn Screen>> {
    let mut chain = vec![root.clone()];
    while let Some(child) = chain.last().and_then(|s| s.children().pop()) {
        chain.push(child);
    }
    chain
}

// ============================================================================
// Lifecycle (the composable state machine)
// ============================================================================

struct Inner<V> {
    state: ScreenState,
    token: Option<ActivationToken>,
    generation: u64,
    children: Vec<Arc<dyn Screen>>,
    view: V,
}

/// Hands out screen instance ids. Clones share one sequence, so every
/// screen built from the same `ScreenContext` gets a distinct id.
#[derive(Debug, Clone, Default)]
pub struct ScreenIds(Arc<AtomicU64>);

impl ScreenIds {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

pub struct Lifecycle<V> {
    id: u64,
    name: String,
    kind: ScreenKind,
    inner: Mutex<Inner<V>>,
}

impl<V> Lifecycle<V> {
    pub fn new(ids: &ScreenIds, name: impl Into<String>, kind: ScreenKind, view: V) -> Self {
        Self {
            id: ids.next(),
            name: name.into(),
            kind,
            inner: Mutex::new(Inner {
                state: ScreenState::Background,
                token: None,
                generation: 0,
                children: Vec::new(),
                view,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ScreenKind {
        self.kind
    }

    // A panic inside `compose` must not wedge navigation for good.
    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ScreenState {
        self.lock().state
    }

    pub fn token(&self) -> Option<ActivationToken> {
        self.lock().token.clone()
    }

    /// Background → Foreground. Issues a fresh token and runs `f` on the view
    /// while still holding the lock.
    pub fn enter<R>(&self, f: impl FnOnce(&mut V) -> R) -> Option<(ActivationToken, R)> {
        let mut inner = self.lock();
        if inner.state == ScreenState::Foreground {
            debug!("[{}] already in foreground", self.name);
            return None;
        }
        inner.generation += 1;
        let token = ActivationToken::new(inner.generation);
        debug!(
            "[{}] entering foreground (activation {})",
            self.name, inner.generation
        );
        inner.token = Some(token.clone());
        inner.state = ScreenState::Foreground;
        let out = f(&mut inner.view);
        Some((token, out))
    }

    /// Foreground → Background, children first.
    pub fn leave(&self) -> bool {
        let mut inner = self.lock();
        if inner.state == ScreenState::Background {
            debug!("[{}] already in background", self.name);
            return false;
        }
        debug!("[{}] entering background", self.name);
        for child in inner.children.drain(..) {
            debug!("[{}] backgrounding child {}", self.name, child.name());
            child.background();
        }
        if let Some(token) = inner.token.take() {
            token.cancel();
        }
        inner.state = ScreenState::Background;
        true
    }

    pub fn with_view<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&self.lock().view)
    }

    /// Mutates the view while in the foreground; `None` otherwise.
    pub fn update<R>(&self, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let mut inner = self.lock();
        if inner.state != ScreenState::Foreground {
            return None;
        }
        Some(f(&mut inner.view))
    }

    /// Applies a result produced under `token`, but only if that activation
    /// is still the live one. Stale results are dropped.
    pub fn apply<R>(&self, token: &ActivationToken, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let mut inner = self.lock();
        let live = inner.state == ScreenState::Foreground
            && !token.is_cancelled()
            && inner
                .token
                .as_ref()
                .is_some_and(|current| current.same_activation(token));
        if !live {
            debug!(
                "[{}] discarding result of ended activation {}",
                self.name,
                token.generation()
            );
            return None;
        }
        Some(f(&mut inner.view))
    }

    /// Foregrounds `child` and records it. Only a foreground screen may open
    /// children.
    pub fn adopt(&self, child: Arc<dyn Screen>) -> Option<Content> {
        let mut inner = self.lock();
        if inner.state != ScreenState::Foreground {
            debug!(
                "[{}] not in foreground, refusing child {}",
                self.name,
                child.name()
            );
            return None;
        }
        let content = child.foreground()?;
        debug!("[{}] opened child {}", self.name, child.name());
        inner.children.push(child);
        Some(content)
    }

    pub fn release_child(&self) -> bool {
        let mut inner = self.lock();
        match inner.children.pop() {
            Some(child) => {
                debug!("[{}] closing child {}", self.name, child.name());
                child.background();
                true
            }
            None => false,
        }
    }

    pub fn children(&self) -> Vec<Arc<dyn Screen>> {
        self.lock().children.clone()
    }
}

// ============================================================================
// ScreenView (what concrete screens implement)
// ============================================================================

pub trait ScreenView: Send + Sync {
    type View: Send;

    fn lifecycle(&self) -> &Lifecycle<Self::View>;

    /// Builds the content from the view. Runs under the screen lock.
    fn compose(&self, view: &Self::View) -> Content;

    /// Resets the view at the start of an activation. Runs under the lock.
    fn prepare(&self, _view: &mut Self::View) {}

    /// Runs after the activation has begun and the lock is released.
    /// This is where async loads are spawned.
    fn activated(&self, _token: &ActivationToken) {}

    fn on_intent(&self, intent: Intent, _input: &FormInput) -> Option<Action> {
        navigation_intent(intent)
    }
}

/// The intents every screen understands.
pub fn navigation_intent(intent: Intent) -> Option<Action> {
    match intent {
        Intent::Navigate(request) => Some(Action::Show(request)),
        Intent::GoBack => Some(Action::GoBack),
        Intent::Dismiss => Some(Action::CloseChild),
        _ => None,
    }
}

impl<T: ScreenView> Screen for T {
    fn id(&self) -> u64 {
        self.lifecycle().id()
    }

    fn name(&self) -> &str {
        self.lifecycle().name()
    }

    fn kind(&self) -> ScreenKind {
        self.lifecycle().kind()
    }

    fn state(&self) -> ScreenState {
        self.lifecycle().state()
    }

    fn token(&self) -> Option<ActivationToken> {
        self.lifecycle().token()
    }

    fn foreground(&self) -> Option<Content> {
        let (token, content) = self.lifecycle().enter(|view| {
            self.prepare(view);
            self.compose(view)
        })?;
        self.activated(&token);
        Some(content)
    }

    fn background(&self) -> bool {
        self.lifecycle().leave()
    }

    fn content(&self) -> Content {
        self.lifecycle().with_view(|view| self.compose(view))
    }

    fn children(&self) -> Vec<Arc<dyn Screen>> {
        self.lifecycle().children()
    }

    fn close_child(&self) -> bool {
        self.lifecycle().release_child()
    }

    fn handle(&self, intent: Intent, input: &FormInput) -> Option<Action> {
        if self.lifecycle().state() != ScreenState::Foreground {
            debug!("[{}] ignoring {:?} while in background", self.name(), intent);
            return None;
        }
        self.on_intent(intent, input)
    }
}

// ============================================================================
// Token-gated background work
// ============================================================================

/// Runs `load` on the runtime and passes its output to `apply` only if the
/// activation is still live when it finishes. A cancelled activation stops
/// the load early and `apply` never runs.
pub fn spawn_gated<T, Fut, F>(token: &ActivationToken, load: Fut, apply: F) -> JoinHandle<()>
where
    T: Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    F: FnOnce(T) + Send + 'static,
{
    let token = token.clone();
    tokio::spawn(async move {
        if token.is_cancelled() {
            return;
        }
        let output = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Load for activation {} cancelled", token.generation());
                return;
            }
            output = load => output,
        };
        if token.is_cancelled() {
            debug!("Load for activation {} finished after cancel", token.generation());
            return;
        }
        apply(output);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::Node;
    use crate::test_support::CountingScreen;
    use std::time::Duration;

    #[test]
    fn test_new_screen_starts_in_background() {
        let screen = CountingScreen::new("a");
        assert_eq!(screen.state(), ScreenState::Background);
        assert!(screen.token().is_none());
    }

    #[test]
    fn test_double_foreground_is_noop_and_keeps_token() {
        let screen = CountingScreen::new("a");
        assert!(screen.foreground().is_some());
        let token = screen.token().unwrap();

        assert!(screen.foreground().is_none());
        let again = screen.token().unwrap();
        assert!(token.same_activation(&again));
        assert!(token.is_live());
        assert_eq!(screen.activations(), 1);
    }

    #[test]
    fn test_double_background_does_not_double_cancel() {
        let screen = CountingScreen::new("a");
        screen.foreground();
        let token = screen.token().unwrap();

        assert!(screen.background());
        assert!(token.is_cancelled());
        assert!(!screen.background());
        // The token was cancelled by the first call; a second cancel is refused
        assert!(!token.cancel());
        assert!(screen.token().is_none());
    }

    #[test]
    fn test_each_activation_gets_a_fresh_token() {
        let screen = CountingScreen::new("a");
        screen.foreground();
        let first = screen.token().unwrap();
        screen.background();
        screen.foreground();
        let second = screen.token().unwrap();

        assert!(first.is_cancelled());
        assert!(second.is_live());
        assert!(!first.same_activation(&second));
        assert_eq!(second.generation(), first.generation() + 1);
    }

    #[test]
    fn test_instances_with_same_name_have_distinct_ids() {
        let ids = ScreenIds::default();
        let a = CountingScreen::with_ids(&ids, "tasks");
        let b = CountingScreen::with_ids(&ids, "tasks");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_id_sequences_are_per_allocator() {
        let first = ScreenIds::default();
        let second = ScreenIds::default();
        assert_eq!(first.next(), 1);
        assert_eq!(first.clone().next(), 2);
        assert_eq!(second.next(), 1);
    }

    #[test]
    fn test_background_cascades_to_children_in_order() {
        let parent = CountingScreen::new("parent");
        parent.foreground();
        let children: Vec<Arc<CountingScreen>> = (0..3)
            .map(|i| Arc::new(CountingScreen::new(&format!("child-{i}"))))
            .collect();
        for child in &children {
            assert!(parent.lifecycle().adopt(child.clone()).is_some());
        }
        let child_tokens: Vec<ActivationToken> =
            children.iter().map(|c| c.token().unwrap()).collect();

        parent.background();

        for (child, token) in children.iter().zip(&child_tokens) {
            assert_eq!(child.state(), ScreenState::Background);
            assert!(token.is_cancelled());
        }
        assert!(parent.children().is_empty());
    }

    #[test]
    fn test_background_screen_cannot_adopt() {
        let parent = CountingScreen::new("parent");
        let child = Arc::new(CountingScreen::new("child"));
        assert!(parent.lifecycle().adopt(child.clone()).is_none());
        assert_eq!(child.state(), ScreenState::Background);
    }

    #[test]
    fn test_close_child_pops_most_recent() {
        let parent = CountingScreen::new("parent");
        parent.foreground();
        let first = Arc::new(CountingScreen::new("first"));
        let second = Arc::new(CountingScreen::new("second"));
        parent.lifecycle().adopt(first.clone());
        parent.lifecycle().adopt(second.clone());

        assert!(parent.close_child());
        assert_eq!(second.state(), ScreenState::Background);
        assert_eq!(first.state(), ScreenState::Foreground);
        assert_eq!(parent.children().len(), 1);
    }

    #[test]
    fn test_focus_chain_follows_latest_child() {
        let concrete = Arc::new(CountingScreen::new("root"));
        concrete.foreground();
        let root: Arc<dyn Screen> = concrete.clone();
        assert_eq!(focus_chain(&root).len(), 1);

        let child = Arc::new(CountingScreen::new("child"));
        concrete.lifecycle().adopt(child.clone());
        let chain = focus_chain(&root);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].name(), "child");
    }

    #[test]
    fn test_apply_rejects_stale_token() {
        let screen = CountingScreen::new("a");
        screen.foreground();
        let stale = screen.token().unwrap();
        screen.background();
        screen.foreground();

        assert!(screen.lifecycle().apply(&stale, |v| *v += 100).is_none());
        let live = screen.token().unwrap();
        assert_eq!(screen.lifecycle().apply(&live, |v| *v += 1), Some(()));
        assert_eq!(screen.lifecycle().with_view(|v| *v), 1);
    }

    #[test]
    fn test_handle_ignored_in_background() {
        let screen = CountingScreen::new("a");
        assert_eq!(screen.handle(Intent::GoBack, &FormInput::default()), None);
        screen.foreground();
        assert_eq!(
            screen.handle(Intent::GoBack, &FormInput::default()),
            Some(Action::GoBack)
        );
    }

    #[test]
    fn test_content_reflects_view() {
        let screen = CountingScreen::new("a");
        screen.foreground();
        let token = screen.token().unwrap();
        screen.lifecycle().apply(&token, |v| *v = 7);
        assert_eq!(screen.content().nodes, vec![Node::text("count: 7")]);
    }

    #[test]
    fn test_concurrent_background_cancels_once() {
        let screen = Arc::new(CountingScreen::new("a"));
        screen.foreground();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = screen.clone();
                std::thread::spawn(move || s.background())
            })
            .collect();
        let transitions = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|did| *did)
            .count();
        assert_eq!(transitions, 1);
    }

    #[tokio::test]
    async fn test_spawn_gated_applies_when_live() {
        let token = ActivationToken::new(1);
        let (tx, rx) = tokio::sync::oneshot::channel();
        spawn_gated(&token, async { 42 }, move |v| {
            let _ = tx.send(v);
        })
        .await
        .unwrap();
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_spawn_gated_skips_apply_after_cancel() {
        let token = ActivationToken::new(1);
        let gate = Arc::new(tokio::sync::Notify::new());
        let applied = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let wait = gate.clone();
        let flag = applied.clone();
        let handle = spawn_gated(
            &token,
            async move {
                wait.notified().await;
                1
            },
            move |_| flag.store(true, std::sync::atomic::Ordering::SeqCst),
        );

        token.cancel();
        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!applied.load(std::sync::atomic::Ordering::SeqCst));
    }
}
