use std::sync::Arc;

use chrono::Utc;

use crate::core::action::Action;
use crate::core::content::{ChoiceOption, Content, FormInput, Intent, Node};
use crate::core::model::{
    MAX_DESCRIPTION_LEN, MAX_LABEL_LEN, Task, TaskList, TaskPriority, TaskStatus, format_due_date,
};
use crate::core::screen::{Lifecycle, ScreenKind, ScreenView, navigation_intent};
use crate::core::token::ActivationToken;
use crate::store::{Query, SortKey, SortOrder, find_task_lists};

use super::{DueDateCell, DueDateScreen, Load, ScreenContext, spawn_store_op};

pub const FIELD_TITLE: &str = "title";
pub const FIELD_LIST: &str = "list";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_PRIORITY: &str = "priority";
pub const FIELD_DESCRIPTION: &str = "description";

#[derive(Debug, Default)]
pub struct MutateTaskView {
    lists: Load<Vec<TaskList>>,
    saving: bool,
    error: Option<String>,
}

/// Create or edit a task. The due date is picked in a child screen.
pub struct MutateTaskScreen {
    lifecycle: Arc<Lifecycle<MutateTaskView>>,
    ctx: ScreenContext,
    task: Option<Task>,
    task_list: Option<TaskList>,
    due: DueDateCell,
}

impl MutateTaskScreen {
    pub fn new(ctx: ScreenContext, task: Option<Task>, task_list: Option<TaskList>) -> Self {
        let due = match &task {
            Some(task) => task.due_date,
            None => Some(Utc::now()),
        };
        Self {
            lifecycle: Arc::new(Lifecycle::new(
                &ctx.ids,
                "mutate task",
                ScreenKind::MutateTask,
                MutateTaskView::default(),
            )),
            ctx,
            task,
            task_list,
            due: DueDateCell::new(due),
        }
    }

    fn selected_list_id(&self) -> Option<u64> {
        self.task
            .as_ref()
            .and_then(|t| t.task_list_id)
            .or_else(|| self.task_list.as_ref().map(|l| l.id))
    }

    fn list_choice(&self, lists: &Load<Vec<TaskList>>) -> Node {
        let mut options = vec![ChoiceOption::new("None", "")];
        match lists.ready() {
            Some(lists) => options.extend(
                lists
                    .iter()
                    .map(|l| ChoiceOption::new(l.choice_label(), l.id.to_string())),
            ),
            // Until the lists arrive, offer only the current one
            None => options.extend(
                self.task_list
                    .iter()
                    .map(|l| ChoiceOption::new(l.choice_label(), l.id.to_string())),
            ),
        }
        let selected = self
            .selected_list_id()
            .and_then(|id| options.iter().position(|o| o.value == id.to_string()))
            .unwrap_or(0);
        Node::Choice {
            id: FIELD_LIST,
            label: "Choose Task List".to_string(),
            options,
            selected,
        }
    }

    fn build_task(&self, input: &FormInput) -> Result<Task, String> {
        let label = input.get(FIELD_TITLE).unwrap_or_default().trim().to_string();
        if label.is_empty() {
            return Err("Title is required".to_string());
        }
        let task_list_id = match input.get(FIELD_LIST).unwrap_or_default() {
            "" => None,
            id => Some(
                id.parse::<u64>()
                    .map_err(|_| format!("Unknown task list '{id}'"))?,
            ),
        };
        let status = input
            .get(FIELD_STATUS)
            .and_then(|s| s.parse::<u32>().ok())
            .map(TaskStatus::from)
            .unwrap_or_default();
        let priority = input
            .get(FIELD_PRIORITY)
            .and_then(|s| s.parse::<u32>().ok())
            .map(TaskPriority::from)
            .unwrap_or_default();

        let mut task = self
            .task
            .clone()
            .unwrap_or_else(|| Task::draft(label.clone(), task_list_id));
        task.label = label;
        task.description = input.get(FIELD_DESCRIPTION).unwrap_or_default().to_string();
        task.status = status;
        task.priority = priority;
        task.task_list_id = task_list_id;
        task.due_date = self.due.get();
        Ok(task)
    }

    fn save(&self, input: &FormInput) -> Option<Action> {
        let token = self.lifecycle.token()?;
        let task = match self.build_task(input) {
            Ok(task) => task,
            Err(message) => {
                self.lifecycle.update(|view| view.error = Some(message))?;
                return Some(Action::Refresh);
            }
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
            async move { store.save_task(task).await },
            |view, result| {
                view.saving = false;
                match result {
                    Ok(_) => Some(Action::GoBack),
                    Err(e) => {
                        view.error = Some(format!("Could not save task: {e}"));
                        None
                    }
                }
            },
        );
        Some(Action::Refresh)
    }

    fn pick_due_date(&self) -> Option<Action> {
        let picker = DueDateScreen::new(&self.ctx.ids, self.due.clone());
        self.lifecycle.adopt(Arc::new(picker))?;
        Some(Action::Refresh)
    }
}

impl ScreenView for MutateTaskScreen {
    type View = MutateTaskView;

    fn lifecycle(&self) -> &Lifecycle<MutateTaskView> {
        &self.lifecycle
    }

    fn prepare(&self, view: &mut MutateTaskView) {
        *view = MutateTaskView::default();
    }

    fn activated(&self, token: &ActivationToken) {
        let store = self.ctx.store.clone();
        let lookup = token.clone();
        spawn_store_op(
            &self.lifecycle,
            &self.ctx.dispatcher,
            token,
            async move {
                let query = Query::new().sort(SortKey::Label, SortOrder::Asc);
                find_task_lists(store.as_ref(), &query, &lookup).await
            },
            |view, result| {
                view.lists = result.into();
                None
            },
        );
    }

    fn compose(&self, view: &MutateTaskView) -> Content {
        let title = match &self.task {
            Some(task) => format!("Edit task {}", task.label),
            None => "Create new task".to_string(),
        };
        let current = self.task.as_ref();
        let status = current.map(|t| t.status).unwrap_or_default();
        let priority = current.map(|t| t.priority).unwrap_or_default();
        let due = self
            .due
            .get()
            .map(format_due_date)
            .unwrap_or_else(|| "None".to_string());

        let mut content = Content::new(title)
            .with(Node::Input {
                id: FIELD_TITLE,
                label: "Title".to_string(),
                value: current.map(|t| t.label.clone()).unwrap_or_default(),
                placeholder: "Task Title".to_string(),
                max_len: MAX_LABEL_LEN,
                multiline: false,
            })
            .with(self.list_choice(&view.lists));
        if view.lists == Load::Pending {
            content.push(Node::Loading("Loading lists...".to_string()));
        }
        content.push(Node::Choice {
            id: FIELD_STATUS,
            label: "Status".to_string(),
            options: TaskStatus::ALL
                .iter()
                .map(|s| ChoiceOption::new(s.title(), s.number().to_string()))
                .collect(),
            selected: TaskStatus::ALL.iter().position(|s| *s == status).unwrap_or(0),
        });
        content.push(Node::Choice {
            id: FIELD_PRIORITY,
            label: "Priority".to_string(),
            options: TaskPriority::ALL
                .iter()
                .map(|p| ChoiceOption::new(p.title(), p.number().to_string()))
                .collect(),
            selected: TaskPriority::ALL
                .iter()
                .position(|p| *p == priority)
                .unwrap_or(0),
        });
        content.push(Node::Row(vec![
            Node::field("Due Date", due),
            Node::button("Pick", Intent::PickDueDate),
        ]));
        content.push(Node::Input {
            id: FIELD_DESCRIPTION,
            label: "Description".to_string(),
            value: current.map(|t| t.description.clone()).unwrap_or_default(),
            placeholder: "Task description in Markdown".to_string(),
            max_len: MAX_DESCRIPTION_LEN,
            multiline: true,
        });
        content.push(Node::Separator);
        if view.saving {
            content.push(Node::Loading("Saving...".to_string()));
        }
        content
            .with(Node::Row(vec![
                Node::button("Cancel", Intent::GoBack),
                Node::button("Save", Intent::Save),
            ]))
            .with_error(view.error.clone().or_else(|| view.lists.error()))
    }

    fn on_intent(&self, intent: Intent, input: &FormInput) -> Option<Action> {
        match intent {
            Intent::Save => self.save(input),
            Intent::PickDueDate => self.pick_due_date(),
            other => navigation_intent(other),
        }
    }
}
