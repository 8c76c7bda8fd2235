use std::sync::Arc;

use crate::core::action::ScreenRequest;
use crate::core::content::{Content, Intent, Node};
use crate::core::model::TaskList;
use crate::core::screen::{Lifecycle, ScreenKind, ScreenView};
use crate::core::token::ActivationToken;
use crate::store::{EntityKind, Query, StoreError, find_task_lists};

use super::{Load, ScreenContext, spawn_store_op};

#[derive(Debug, Default)]
pub struct TaskListsView {
    lists: Load<(u64, Vec<TaskList>)>,
}

/// Every list, with open/edit actions per list.
pub struct TaskListsScreen {
    lifecycle: Arc<Lifecycle<TaskListsView>>,
    ctx: ScreenContext,
}

impl TaskListsScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            lifecycle: Arc::new(Lifecycle::new(
                &ctx.ids,
                "task lists",
                ScreenKind::TaskLists,
                TaskListsView::default(),
            )),
            ctx,
        }
    }
}

impl ScreenView for TaskListsScreen {
    type View = TaskListsView;

    fn lifecycle(&self) -> &Lifecycle<TaskListsView> {
        &self.lifecycle
    }

    fn prepare(&self, view: &mut TaskListsView) {
        view.lists = Load::Pending;
    }

    fn activated(&self, token: &ActivationToken) {
        let store = self.ctx.store.clone();
        let lookup = token.clone();
        spawn_store_op(
            &self.lifecycle,
            &self.ctx.dispatcher,
            token,
            async move {
                let query = Query::new();
                let count = store.count(EntityKind::TaskList, &query, &lookup).await?;
                let lists = find_task_lists(store.as_ref(), &query, &lookup).await?;
                Ok::<_, StoreError>((count, lists))
            },
            |view, result| {
                view.lists = result.into();
                None
            },
        );
    }

    fn compose(&self, view: &TaskListsView) -> Content {
        let mut content = Content::new("Task lists");
        match &view.lists {
            Load::Pending => {
                content.push(Node::Loading("Loading lists...".to_string()));
            }
            Load::Ready((count, lists)) => {
                if lists.is_empty() {
                    content.push(Node::Muted("No lists yet.".to_string()));
                }
                for list in lists {
                    content.push(Node::Row(vec![
                        Node::text(list.label.clone()),
                        Node::button(
                            "Open",
                            Intent::Navigate(ScreenRequest::tasks_in_list(list)),
                        ),
                        Node::button(
                            "Edit",
                            Intent::Navigate(ScreenRequest::MutateTaskList(Some(list.clone()))),
                        ),
                    ]));
                }
                content.footer = Some(format!("Total lists: {count}"));
            }
            Load::Failed(e) => content.error = Some(format!("Could not load lists: {e}")),
        }
        content
            .with(Node::Separator)
            .with(Node::button(
                "New list",
                Intent::Navigate(ScreenRequest::MutateTaskList(None)),
            ))
            .with(Node::button("Back", Intent::GoBack))
    }
}
