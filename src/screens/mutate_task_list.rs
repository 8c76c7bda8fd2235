use std::sync::Arc;

use futures::FutureExt;

use crate::core::action::{Action, ScreenRequest};
use crate::core::content::{Content, FormInput, Intent, Node};
use crate::core::model::{MAX_DESCRIPTION_LEN, MAX_LABEL_LEN, TaskList};
use crate::core::screen::{Lifecycle, ScreenKind, ScreenView, navigation_intent};

use super::{ConfirmScreen, ScreenContext, spawn_store_op};

pub const FIELD_LABEL: &str = "label";
pub const FIELD_DESCRIPTION: &str = "description";

#[derive(Debug, Default)]
pub struct MutateTaskListView {
    saving: bool,
    error: Option<String>,
}

/// Create or edit a list. Editing also offers Delete behind a confirmation.
pub struct MutateTaskListScreen {
    lifecycle: Arc<Lifecycle<MutateTaskListView>>,
    ctx: ScreenContext,
    task_list: Option<TaskList>,
}

impl MutateTaskListScreen {
    pub fn new(ctx: ScreenContext, task_list: Option<TaskList>) -> Self {
        Self {
            lifecycle: Arc::new(Lifecycle::new(
                &ctx.ids,
                "mutate task list",
                ScreenKind::MutateTaskList,
                MutateTaskListView::default(),
            )),
            ctx,
            task_list,
        }
    }

    fn save(&self, input: &FormInput) -> Option<Action> {
        let token = self.lifecycle.token()?;
        let label = input.get(FIELD_LABEL).unwrap_or_default().trim().to_string();
        if label.is_empty() {
            self.lifecycle
                .update(|view| view.error = Some("Name is required".to_string()))?;
            return Some(Action::Refresh);
        }
        let description = input.get(FIELD_DESCRIPTION).unwrap_or_default().to_string();
        let list = match &self.task_list {
            Some(existing) => TaskList {
                label,
                description,
                ..existing.clone()
            },
            None => TaskList::draft(label, description),
        };

        let started = self.lifecycle.update(|view| {
            if view.saving {
                return false;
            }
            view.saving = true;
            view.error = None;
            true
        })?;
        if !started {
            return None;
        }
        let store = self.ctx.store.clone();
        spawn_store_op(
            &self.lifecycle,
            &self.ctx.dispatcher,
            &token,
            async move { store.save_task_list(list).await },
            |view, result| {
                view.saving = false;
                match result {
                    Ok(saved) => Some(Action::Show(ScreenRequest::tasks_in_list(&saved))),
                    Err(e) => {
                        view.error = Some(format!("Could not save list: {e}"));
                        None
                    }
                }
            },
        );
        Some(Action::Refresh)
    }

    fn confirm_delete(&self) -> Option<Action> {
        let list = self.task_list.clone()?;
        let store = self.ctx.store.clone();
        let confirm = ConfirmScreen::new(
            self.ctx.clone(),
            format!(
                "Delete list \"{}\" and all of its tasks?",
                list.label
            ),
            move || {
                let store = store.clone();
                let id = list.id;
                async move { store.delete_task_list(id).await }.boxed()
            },
            Action::Show(ScreenRequest::TaskLists),
        );
        self.lifecycle.adopt(Arc::new(confirm))?;
        Some(Action::Refresh)
    }
}

impl ScreenView for MutateTaskListScreen {
    type View = MutateTaskListView;

    fn lifecycle(&self) -> &Lifecycle<MutateTaskListView> {
        &self.lifecycle
    }

    fn prepare(&self, view: &mut MutateTaskListView) {
        *view = MutateTaskListView::default();
    }

    fn compose(&self, view: &MutateTaskListView) -> Content {
        let (title, label, description) = match &self.task_list {
            Some(list) => (
                format!("Edit task list {}", list.label),
                list.label.clone(),
                list.description.clone(),
            ),
            None => ("Create task list".to_string(), String::new(), String::new()),
        };

        let mut content = Content::new(title)
            .with(Node::Input {
                id: FIELD_LABEL,
                label: "Name".to_string(),
                value: label,
                placeholder: "Enter task list name.".to_string(),
                max_len: MAX_LABEL_LEN,
                multiline: false,
            })
            .with(Node::Input {
                id: FIELD_DESCRIPTION,
                label: "Description".to_string(),
                value: description,
                placeholder: "Enter Markdown formatted text.".to_string(),
                max_len: MAX_DESCRIPTION_LEN,
                multiline: true,
            })
            .with(Node::Separator);
        if view.saving {
            content.push(Node::Loading("Saving...".to_string()));
        }

        let mut buttons = Vec::new();
        if self.task_list.is_some() {
            buttons.push(Node::button("Delete", Intent::Delete));
        }
        buttons.push(Node::button("Cancel", Intent::GoBack));
        buttons.push(Node::button("Save", Intent::Save));
        content.with(Node::Row(buttons)).with_error(view.error.clone())
    }

    fn on_intent(&self, intent: Intent, input: &FormInput) -> Option<Action> {
        match intent {
            Intent::Save => self.save(input),
            Intent::Delete => self.confirm_delete(),
            other => navigation_intent(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::screen::{Screen, ScreenState};
    use crate::store::{DataStore, Query, find_task_lists};
    use crate::test_support::{next_dispatch, test_context};

    #[tokio::test]
    async fn test_create_shows_new_list() {
        let (ctx, rx) = test_context();
        let store = ctx.store.clone();
        let screen = MutateTaskListScreen::new(ctx, None);
        let content = screen.foreground().unwrap();
        assert_eq!(content.title, "Create task list");

        let input = FormInput::default()
            .with(FIELD_LABEL, "  Groceries ")
            .with(FIELD_DESCRIPTION, "weekly run");
        assert_eq!(screen.handle(Intent::Save, &input), Some(Action::Refresh));

        let dispatch = next_dispatch(&rx).await;
        let token = crate::core::token::ActivationToken::new(1);
        let lists = find_task_lists(store.as_ref(), &Query::new(), &token).await.unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].label, "Groceries");
        assert_eq!(
            dispatch.action,
            Action::Show(ScreenRequest::tasks_in_list(&lists[0]))
        );
    }

    #[tokio::test]
    async fn test_second_save_while_saving_is_ignored() {
        let (ctx, rx) = test_context();
        let store = ctx.store.clone();
        let screen = MutateTaskListScreen::new(ctx, None);
        screen.foreground();
        let input = FormInput::default().with(FIELD_LABEL, "Errands");

        assert_eq!(screen.handle(Intent::Save, &input), Some(Action::Refresh));
        assert_eq!(screen.handle(Intent::Save, &input), None);
        assert!(matches!(next_dispatch(&rx).await.action, Action::Show(_)));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        let token = crate::core::token::ActivationToken::new(1);
        let lists = find_task_lists(store.as_ref(), &Query::new(), &token).await.unwrap();
        assert_eq!(lists.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_name_rejected_inline() {
        let (ctx, _rx) = test_context();
        let screen = MutateTaskListScreen::new(ctx, None);
        screen.foreground();
        let input = FormInput::default().with(FIELD_LABEL, "   ");
        assert_eq!(screen.handle(Intent::Save, &input), Some(Action::Refresh));
        assert_eq!(screen.content().error.as_deref(), Some("Name is required"));
    }

    #[tokio::test]
    async fn test_delete_opens_confirm_child() {
        let (ctx, _rx) = test_context();
        let list = ctx
            .store
            .save_task_list(TaskList::draft("Old", ""))
            .await
            .unwrap();
        let screen = MutateTaskListScreen::new(ctx, Some(list));
        screen.foreground();

        assert_eq!(
            screen.handle(Intent::Delete, &FormInput::default()),
            Some(Action::Refresh)
        );
        let children = screen.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].kind(), ScreenKind::ConfirmDelete);
        assert_eq!(children[0].state(), ScreenState::Foreground);

        screen.background();
        assert_eq!(children[0].state(), ScreenState::Background);
    }

    #[tokio::test]
    async fn test_create_has_no_delete() {
        let (ctx, _rx) = test_context();
        let screen = MutateTaskListScreen::new(ctx, None);
        screen.foreground();
        assert_eq!(screen.handle(Intent::Delete, &FormInput::default()), None);
        assert!(screen.children().is_empty());
    }
}
