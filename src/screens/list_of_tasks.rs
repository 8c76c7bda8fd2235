use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use crate::core::action::{Action, ScreenRequest};
use crate::core::content::{Content, FormInput, Intent, Node};
use crate::core::model::{Task, TaskList};
use crate::core::screen::{Lifecycle, ScreenKind, ScreenView, navigation_intent};
use crate::core::token::ActivationToken;
use crate::store::{EntityKind, Query, Relation, StoreError, find_tasks};

use super::{Load, ScreenContext, spawn_store_op};

#[derive(Debug, Default)]
pub struct ListOfTasksView {
    tasks: Load<(u64, Vec<Task>)>,
    /// Failure of a row action (status change, delete).
    error: Option<String>,
    /// Tasks with a status or priority write in flight.
    updating: HashSet<u64>,
}

/// Tasks matching a query, e.g. one list, or everything due today.
pub struct ListOfTasksScreen {
    lifecycle: Arc<Lifecycle<ListOfTasksView>>,
    ctx: ScreenContext,
    title: String,
    task_list: Option<TaskList>,
    query: Query,
}

impl ListOfTasksScreen {
    pub fn new(ctx: ScreenContext, title: String, task_list: Option<TaskList>, query: Query) -> Self {
        Self {
            lifecycle: Arc::new(Lifecycle::new(
                &ctx.ids,
                format!("list of tasks: {title}"),
                ScreenKind::ListOfTasks,
                ListOfTasksView::default(),
            )),
            ctx,
            title,
            task_list,
            query: query.preload(Relation::TaskList),
        }
    }

    fn task(&self, id: u64) -> Option<Task> {
        self.lifecycle.with_view(|view| {
            view.tasks
                .ready()
                .and_then(|(_, tasks)| tasks.iter().find(|t| t.id == id).cloned())
        })
    }

    fn cycle(&self, id: u64, priority: bool) -> Option<Action> {
        let token = self.lifecycle.token()?;
        let task = self.task(id)?;
        // The next value comes from the row, so wait for the previous write
        if !self.lifecycle.update(|view| view.updating.insert(id))? {
            debug!("[{}] task {} still updating", self.lifecycle.name(), id);
            return None;
        }
        let store = self.ctx.store.clone();
        spawn_store_op(
            &self.lifecycle,
            &self.ctx.dispatcher,
            &token,
            async move {
                if priority {
                    store.set_task_priority(id, task.priority.next()).await
                } else {
                    store.set_task_status(id, task.status.next()).await
                }
            },
            move |view, result| {
                view.updating.remove(&id);
                match result {
                    Ok(updated) => replace_task(view, updated),
                    Err(e) => view.error = Some(format!("Could not update task: {e}")),
                }
                None
            },
        );
        None
    }

    fn delete(&self, id: u64) -> Option<Action> {
        let token = self.lifecycle.token()?;
        let store = self.ctx.store.clone();
        spawn_store_op(
            &self.lifecycle,
            &self.ctx.dispatcher,
            &token,
            async move { store.delete_task(id).await },
            move |view, result| {
                match result {
                    Ok(()) => {
                        if let Some((count, tasks)) = view.tasks.ready_mut() {
                            tasks.retain(|t| t.id != id);
                            *count = count.saturating_sub(1);
                        }
                    }
                    Err(e) => view.error = Some(format!("Could not delete task: {e}")),
                }
                None
            },
        );
        None
    }
}

fn replace_task(view: &mut ListOfTasksView, updated: Task) {
    if let Some((_, tasks)) = view.tasks.ready_mut()
        && let Some(slot) = tasks.iter_mut().find(|t| t.id == updated.id)
    {
        // The store doesn't preload on updates; keep the list we already had
        let task_list = slot.task_list.take();
        *slot = Task {
            task_list,
            ..updated
        };
    }
}

impl ScreenView for ListOfTasksScreen {
    type View = ListOfTasksView;

    fn lifecycle(&self) -> &Lifecycle<ListOfTasksView> {
        &self.lifecycle
    }

    fn prepare(&self, view: &mut ListOfTasksView) {
        *view = ListOfTasksView::default();
    }

    fn activated(&self, token: &ActivationToken) {
        let store = self.ctx.store.clone();
        let query = self.query.clone();
        let lookup = token.clone();
        spawn_store_op(
            &self.lifecycle,
            &self.ctx.dispatcher,
            token,
            async move {
                let count = store.count(EntityKind::Task, &query, &lookup).await?;
                let tasks = find_tasks(store.as_ref(), &query, &lookup).await?;
                Ok::<_, StoreError>((count, tasks))
            },
            |view, result| {
                view.tasks = result.into();
                None
            },
        );
    }

    fn compose(&self, view: &ListOfTasksView) -> Content {
        let mut content = Content::new(self.title.clone());
        if let Some(list) = &self.task_list
            && !list.description.is_empty()
        {
            content.push(Node::Markdown(list.description.clone()));
            content.push(Node::Separator);
        }
        match &view.tasks {
            Load::Pending => {
                content.push(Node::Loading("Loading tasks...".to_string()));
            }
            Load::Ready((count, tasks)) => {
                if tasks.is_empty() {
                    content.push(Node::Muted("Nothing here.".to_string()));
                }
                for task in tasks {
                    content.push(self.task_row(task));
                }
                content.footer = Some(format!("Total tasks: {count}"));
            }
            Load::Failed(e) => content.error = Some(format!("Could not load tasks: {e}")),
        }
        if view.error.is_some() {
            content.error = view.error.clone();
        }
        content
            .with(Node::Separator)
            .with(Node::button(
                "New task",
                Intent::Navigate(ScreenRequest::MutateTask {
                    task: None,
                    task_list: self.task_list.clone(),
                }),
            ))
            .with(Node::button("Back", Intent::GoBack))
    }

    fn on_intent(&self, intent: Intent, _input: &FormInput) -> Option<Action> {
        match intent {
            Intent::CycleStatus(id) => self.cycle(id, false),
            Intent::CyclePriority(id) => self.cycle(id, true),
            Intent::DeleteTask(id) => self.delete(id),
            other => navigation_intent(other),
        }
    }
}

impl ListOfTasksScreen {
    fn task_row(&self, task: &Task) -> Node {
        let list = self.task_list.clone().or_else(|| task.task_list.clone());
        let mut row = vec![
            Node::button(task.status.marker(), Intent::CycleStatus(task.id)),
            Node::button(task.priority.marker(), Intent::CyclePriority(task.id)),
            Node::button(
                task.label.clone(),
                Intent::Navigate(ScreenRequest::Task(task.clone())),
            ),
        ];
        if task.due_date.is_some() {
            row.push(Node::Muted(task.due_date_display()));
        }
        if self.task_list.is_none()
            && let Some(list) = &task.task_list
        {
            row.push(Node::Muted(format!("({})", list.label)));
        }
        row.push(Node::button(
            "Edit",
            Intent::Navigate(ScreenRequest::MutateTask {
                task: Some(task.clone()),
                task_list: list,
            }),
        ));
        row.push(Node::button("Delete", Intent::DeleteTask(task.id)));
        Node::Row(row)
    }
}
