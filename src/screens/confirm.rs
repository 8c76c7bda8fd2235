use std::sync::Arc;

use futures::future::BoxFuture;

use crate::core::action::Action;
use crate::core::content::{Content, FormInput, Intent, Node};
use crate::core::screen::{Lifecycle, ScreenKind, ScreenView, navigation_intent};
use crate::store::StoreResult;

use super::{ScreenContext, spawn_store_op};

type Operation = Box<dyn Fn() -> BoxFuture<'static, StoreResult<()>> + Send + Sync>;

#[derive(Debug, Default)]
pub struct ConfirmView {
    busy: bool,
    error: Option<String>,
}

/// Child screen asking the user to confirm a destructive store operation.
/// On success it dispatches `then`.
pub struct ConfirmScreen {
    lifecycle: Arc<Lifecycle<ConfirmView>>,
    ctx: ScreenContext,
    prompt: String,
    operation: Operation,
    then: Action,
}

impl ConfirmScreen {
    pub fn new(
        ctx: ScreenContext,
        prompt: impl Into<String>,
        operation: impl Fn() -> BoxFuture<'static, StoreResult<()>> + Send + Sync + 'static,
        then: Action,
    ) -> Self {
        Self {
            lifecycle: Arc::new(Lifecycle::new(
                &ctx.ids,
                "confirm delete",
                ScreenKind::ConfirmDelete,
                ConfirmView::default(),
            )),
            ctx,
            prompt: prompt.into(),
            operation: Box::new(operation),
            then,
        }
    }

    fn confirm(&self) -> Option<Action> {
        let token = self.lifecycle.token()?;
        let started = self.lifecycle.update(|view| {
            if view.busy {
                return false;
            }
            view.busy = true;
            view.error = None;
            true
        })?;
        if !started {
            return None;
        }
        let then = self.then.clone();
        spawn_store_op(
            &self.lifecycle,
            &self.ctx.dispatcher,
            &token,
            (self.operation)(),
            move |view, result| {
                view.busy = false;
                match result {
                    Ok(()) => Some(then),
                    Err(e) => {
                        view.error = Some(e.to_string());
                        None
                    }
                }
            },
        );
        Some(Action::Refresh)
    }
}

impl ScreenView for ConfirmScreen {
    type View = ConfirmView;

    fn lifecycle(&self) -> &Lifecycle<ConfirmView> {
        &self.lifecycle
    }

    fn prepare(&self, view: &mut ConfirmView) {
        *view = ConfirmView::default();
    }

    fn compose(&self, view: &ConfirmView) -> Content {
        let mut content = Content::new("Are you sure?").with(Node::text(self.prompt.clone()));
        if view.busy {
            content.push(Node::Loading("Deleting...".to_string()));
        }
        content
            .with(Node::Row(vec![
                Node::button("Delete", Intent::Save),
                Node::button("Cancel", Intent::Dismiss),
            ]))
            .with_error(view.error.clone())
    }

    fn on_intent(&self, intent: Intent, _input: &FormInput) -> Option<Action> {
        match intent {
            Intent::Save => self.confirm(),
            other => navigation_intent(other),
        }
    }
}
