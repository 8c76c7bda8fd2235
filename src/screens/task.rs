use std::sync::Arc;

use crate::core::action::{Action, ScreenRequest};
use crate::core::content::{Content, FormInput, Intent, Node};
use crate::core::model::Task;
use crate::core::screen::{Lifecycle, ScreenKind, ScreenView, navigation_intent};
use crate::core::token::ActivationToken;
use crate::store::{Filter, Query, Relation, StoreError, find_tasks, list_for_task};

use super::{Load, ScreenContext, spawn_store_op};

#[derive(Debug)]
pub struct TaskView {
    task: Task,
    /// Name of the task's list once resolved; `None` inside means no list.
    list_name: Load<Option<String>>,
    error: Option<String>,
    /// A status or priority write is in flight.
    updating: bool,
}

/// Read-only view of one task with quick status and priority switches.
pub struct TaskScreen {
    lifecycle: Arc<Lifecycle<TaskView>>,
    ctx: ScreenContext,
    id: u64,
}

impl TaskScreen {
    pub fn new(ctx: ScreenContext, task: Task) -> Self {
        let id = task.id;
        Self {
            lifecycle: Arc::new(Lifecycle::new(
                &ctx.ids,
                format!("task {id}"),
                ScreenKind::Task,
                TaskView {
                    task,
                    list_name: Load::Pending,
                    error: None,
                    updating: false,
                },
            )),
            ctx,
            id,
        }
    }

    fn cycle(&self, priority: bool) -> Option<Action> {
        let token = self.lifecycle.token()?;
        let task = self.lifecycle.update(|view| {
            if view.updating {
                return None;
            }
            view.updating = true;
            Some(view.task.clone())
        })??;
        let store = self.ctx.store.clone();
        spawn_store_op(
            &self.lifecycle,
            &self.ctx.dispatcher,
            &token,
            async move {
                if priority {
                    store.set_task_priority(task.id, task.priority.next()).await
                } else {
                    store.set_task_status(task.id, task.status.next()).await
                }
            },
            |view, result| {
                view.updating = false;
                match result {
                    Ok(updated) => {
                        view.task.status = updated.status;
                        view.task.priority = updated.priority;
                    }
                    Err(e) => view.error = Some(format!("Could not update task: {e}")),
                }
                None
            },
        );
        None
    }

    fn delete(&self) -> Option<Action> {
        let token = self.lifecycle.token()?;
        let store = self.ctx.store.clone();
        let id = self.id;
        spawn_store_op(
            &self.lifecycle,
            &self.ctx.dispatcher,
            &token,
            async move { store.delete_task(id).await },
            |view, result| match result {
                Ok(()) => Some(Action::GoBack),
                Err(e) => {
                    view.error = Some(format!("Could not delete task: {e}"));
                    None
                }
            },
        );
        None
    }
}

impl ScreenView for TaskScreen {
    type View = TaskView;

    fn lifecycle(&self) -> &Lifecycle<TaskView> {
        &self.lifecycle
    }

    fn prepare(&self, view: &mut TaskView) {
        view.error = None;
        view.updating = false;
        view.list_name = match (&view.task.task_list, view.task.task_list_id) {
            (Some(list), _) => Load::Ready(Some(list.label.clone())),
            (None, None) => Load::Ready(None),
            (None, Some(_)) => Load::Pending,
        };
    }

    /// Reloads the task, since it may have been edited while this screen
    /// was in the background.
    fn activated(&self, token: &ActivationToken) {
        let store = self.ctx.store.clone();
        let lookup = token.clone();
        let id = self.id;
        spawn_store_op(
            &self.lifecycle,
            &self.ctx.dispatcher,
            token,
            async move {
                let query = Query::new()
                    .filter(Filter::Id(id))
                    .preload(Relation::TaskList);
                let Some(task) = find_tasks(store.as_ref(), &query, &lookup)
                    .await?
                    .into_iter()
                    .next()
                else {
                    return Ok(None);
                };
                let list = list_for_task(store.as_ref(), &task, &lookup).await?;
                Ok::<_, StoreError>(Some((task, list.map(|l| l.label))))
            },
            move |view, result| {
                match result {
                    Ok(Some((task, list_name))) => {
                        view.task = task;
                        view.list_name = Load::Ready(list_name);
                    }
                    Ok(None) => view.error = Some(format!("Task {id} no longer exists")),
                    Err(e) => view.list_name = Load::Failed(e.to_string()),
                }
                None
            },
        );
    }

    fn compose(&self, view: &TaskView) -> Content {
        let task = &view.task;
        let list = match &view.list_name {
            Load::Pending => "Loading...".to_string(),
            Load::Ready(Some(name)) => name.clone(),
            Load::Ready(None) => "None".to_string(),
            Load::Failed(_) => "Unavailable".to_string(),
        };
        let description = if task.description.trim().is_empty() {
            Node::Muted("No description.".to_string())
        } else {
            Node::Markdown(task.description.clone())
        };

        Content::new(task.label.clone())
            .with(Node::Row(vec![
                Node::button(
                    format!("{} {}", task.status.marker(), task.status.title()),
                    Intent::CycleStatus(task.id),
                ),
                Node::button(
                    format!("{} {}", task.priority.marker(), task.priority.title()),
                    Intent::CyclePriority(task.id),
                ),
            ]))
            .with(Node::field("List", list))
            .with(Node::field("Due Date", task.due_date_display()))
            .with(Node::Header("Description".to_string()))
            .with(description)
            .with(Node::Separator)
            .with(Node::Row(vec![
                Node::button(
                    "Edit",
                    Intent::Navigate(ScreenRequest::MutateTask {
                        task: Some(task.clone()),
                        task_list: task.task_list.clone(),
                    }),
                ),
                Node::button("Delete", Intent::Delete),
                Node::button("Back", Intent::GoBack),
            ]))
            .with_error(view.error.clone().or_else(|| view.list_name.error()))
    }

    fn on_intent(&self, intent: Intent, _input: &FormInput) -> Option<Action> {
        match intent {
            Intent::CycleStatus(_) => self.cycle(false),
            Intent::CyclePriority(_) => self.cycle(true),
            Intent::Delete => self.delete(),
            other => navigation_intent(other),
        }
    }
}
