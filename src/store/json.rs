//! JSON-file backed [`DataStore`].
//!
//! The whole data set lives in memory behind a `tokio::sync::RwLock` and is
//! written back to disk after every mutation. Writes are atomic (`.tmp` then
//! `rename()`), and a failed write leaves the in-memory data untouched.
//!
//! Without a path the store is purely in-memory.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Local, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::model::{
    MAX_DESCRIPTION_LEN, MAX_LABEL_LEN, Task, TaskList, TaskPriority, TaskStatus, clamp_chars,
};
use crate::core::token::ActivationToken;

use super::{
    DataStore, EntityKind, Filter, Query, QueryPlan, Record, Relation, SortKey, SortOrder,
    StoreError, StoreResult,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    task_lists: Vec<TaskList>,
    #[serde(default)]
    tasks: Vec<Task>,
}

impl StoreData {
    fn allocate_id(&mut self) -> u64 {
        let max_seen = self
            .task_lists
            .iter()
            .map(|l| l.id)
            .chain(self.tasks.iter().map(|t| t.id))
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(max_seen + 1);
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn next_order(&self) -> u64 {
        self.tasks.iter().map(|t| t.order).max().unwrap_or(0) + 1
    }

    fn has_list(&self, id: u64) -> bool {
        self.task_lists.iter().any(|l| l.id == id)
    }

    fn task_mut(&mut self, id: u64) -> StoreResult<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Task,
                id,
            })
    }
}

pub struct JsonStore {
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
}

impl JsonStore {
    /// Opens the store at `path`. A missing file is an empty store; the file
    /// is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let data = if path.exists() {
            let json = fs::read_to_string(&path)?;
            let data: StoreData = serde_json::from_str(&json)?;
            info!(
                "Loaded {} lists and {} tasks from {}",
                data.task_lists.len(),
                data.tasks.len(),
                path.display()
            );
            data
        } else {
            info!("No data file at {}, starting empty", path.display());
            StoreData::default()
        };
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(StoreData::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persist(&self, data: &StoreData) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        atomic_write_json(path, data)?;
        debug!("Store written to {}", path.display());
        Ok(())
    }

    /// Runs `f` on a copy of the data and commits it only if `f` succeeds and
    /// the copy reaches disk.
    async fn mutate<R, F>(&self, f: F) -> StoreResult<R>
    where
        R: Send,
        F: FnOnce(&mut StoreData) -> StoreResult<R> + Send,
    {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let out = f(&mut next)?;
        self.persist(&next)?;
        *data = next;
        Ok(out)
    }
}

fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

// ============================================================================
// Query execution
// ============================================================================

fn task_matches(task: &Task, filter: &Filter) -> bool {
    match filter {
        Filter::Id(id) => task.id == *id,
        Filter::TaskList(id) => task.task_list_id == Some(*id),
        Filter::Status(statuses) => statuses.contains(&task.status),
        Filter::DueOn(day) => task
            .due_date
            .is_some_and(|due| due.with_timezone(&Local).date_naive() == *day),
    }
}

fn list_matches(list: &TaskList, filter: &Filter) -> bool {
    match filter {
        Filter::Id(id) => list.id == *id,
        // Rejected by QueryPlan::validate
        _ => false,
    }
}

fn directed(ord: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

fn compare_tasks(a: &Task, b: &Task, sorts: &[(SortKey, SortOrder)]) -> Ordering {
    for (key, order) in sorts {
        let ord = match key {
            SortKey::Id => directed(a.id.cmp(&b.id), *order),
            SortKey::Label => directed(a.label.cmp(&b.label), *order),
            SortKey::CreatedAt => directed(a.created_at.cmp(&b.created_at), *order),
            SortKey::Order => directed(a.order.cmp(&b.order), *order),
            SortKey::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => directed(x.cmp(&y), *order),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Date => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_lists(a: &TaskList, b: &TaskList, sorts: &[(SortKey, SortOrder)]) -> Ordering {
    for (key, order) in sorts {
        let ord = match key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Label => a.label.cmp(&b.label),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::DueDate | SortKey::Order => Ordering::Equal,
        };
        let ord = directed(ord, *order);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn select_tasks(data: &StoreData, plan: &QueryPlan) -> Vec<Task> {
    let mut tasks: Vec<Task> = data
        .tasks
        .iter()
        .filter(|task| plan.filters.iter().all(|f| task_matches(task, f)))
        .cloned()
        .collect();
    tasks.sort_by(|a, b| compare_tasks(a, b, &plan.sorts));
    if let Some(limit) = plan.limit {
        tasks.truncate(limit);
    }
    if plan.preloads.contains(&Relation::TaskList) {
        for task in &mut tasks {
            task.task_list = task
                .task_list_id
                .and_then(|id| data.task_lists.iter().find(|l| l.id == id).cloned());
        }
    }
    tasks
}

fn select_lists(data: &StoreData, plan: &QueryPlan) -> Vec<TaskList> {
    let mut lists: Vec<TaskList> = data
        .task_lists
        .iter()
        .filter(|list| plan.filters.iter().all(|f| list_matches(list, f)))
        .cloned()
        .collect();
    lists.sort_by(|a, b| compare_lists(a, b, &plan.sorts));
    if let Some(limit) = plan.limit {
        lists.truncate(limit);
    }
    lists
}

fn validate_label(label: &str, what: &str) -> StoreResult<String> {
    let label = clamp_chars(label.trim(), MAX_LABEL_LEN);
    if label.is_empty() {
        return Err(StoreError::Validation(format!("{what} title is required")));
    }
    Ok(label)
}

#[async_trait]
impl DataStore for JsonStore {
    async fn count(&self, kind: EntityKind, query: &Query, token: &ActivationToken) -> StoreResult<u64> {
        token.check()?;
        let mut plan = query.plan();
        plan.sorts.clear();
        plan.limit = None;
        plan.preloads.clear();
        plan.validate(kind)?;

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(StoreError::Cancelled),
            data = self.data.read() => {
                let n = match kind {
                    EntityKind::Task => data
                        .tasks
                        .iter()
                        .filter(|t| plan.filters.iter().all(|f| task_matches(t, f)))
                        .count(),
                    EntityKind::TaskList => data
                        .task_lists
                        .iter()
                        .filter(|l| plan.filters.iter().all(|f| list_matches(l, f)))
                        .count(),
                };
                Ok(n as u64)
            }
        }
    }

    async fn find(
        &self,
        kind: EntityKind,
        query: &Query,
        token: &ActivationToken,
    ) -> StoreResult<Vec<Record>> {
        token.check()?;
        let plan = query.plan();
        plan.validate(kind)?;

        let records = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(StoreError::Cancelled),
            data = self.data.read() => match kind {
                EntityKind::Task => select_tasks(&data, &plan).into_iter().map(Record::Task).collect(),
                EntityKind::TaskList => select_lists(&data, &plan).into_iter().map(Record::TaskList).collect(),
            },
        };
        token.check()?;
        Ok(records)
    }

    async fn save_task(&self, task: Task) -> StoreResult<Task> {
        let label = validate_label(&task.label, "task")?;
        self.mutate(move |data| {
            if let Some(list_id) = task.task_list_id
                && !data.has_list(list_id)
            {
                return Err(StoreError::NotFound {
                    kind: EntityKind::TaskList,
                    id: list_id,
                });
            }
            let now = Utc::now();
            let mut task = Task {
                label,
                description: clamp_chars(&task.description, MAX_DESCRIPTION_LEN),
                task_list: None,
                updated_at: now,
                ..task
            };
            if task.is_saved() {
                let existing = data.task_mut(task.id)?;
                task.created_at = existing.created_at;
                task.order = existing.order;
                *existing = task.clone();
                info!("Updated task {}", task.id);
            } else {
                task.id = data.allocate_id();
                task.order = data.next_order();
                task.created_at = now;
                data.tasks.push(task.clone());
                info!("Created task {} ({})", task.id, task.label);
            }
            Ok(task)
        })
        .await
    }

    async fn save_task_list(&self, list: TaskList) -> StoreResult<TaskList> {
        let label = validate_label(&list.label, "list")?;
        self.mutate(move |data| {
            let now = Utc::now();
            let mut list = TaskList {
                label,
                description: clamp_chars(&list.description, MAX_DESCRIPTION_LEN),
                updated_at: now,
                ..list
            };
            if list.is_saved() {
                let existing = data
                    .task_lists
                    .iter_mut()
                    .find(|l| l.id == list.id)
                    .ok_or(StoreError::NotFound {
                        kind: EntityKind::TaskList,
                        id: list.id,
                    })?;
                list.created_at = existing.created_at;
                *existing = list.clone();
                info!("Updated task list {}", list.id);
            } else {
                list.id = data.allocate_id();
                list.created_at = now;
                data.task_lists.push(list.clone());
                info!("Created task list {} ({})", list.id, list.label);
            }
            Ok(list)
        })
        .await
    }

    async fn delete_task(&self, id: u64) -> StoreResult<()> {
        self.mutate(move |data| {
            let before = data.tasks.len();
            data.tasks.retain(|t| t.id != id);
            if data.tasks.len() == before {
                return Err(StoreError::NotFound {
                    kind: EntityKind::Task,
                    id,
                });
            }
            info!("Deleted task {}", id);
            Ok(())
        })
        .await
    }

    async fn delete_task_list(&self, id: u64) -> StoreResult<()> {
        self.mutate(move |data| {
            if !data.has_list(id) {
                return Err(StoreError::NotFound {
                    kind: EntityKind::TaskList,
                    id,
                });
            }
            let before = data.tasks.len();
            data.tasks.retain(|t| t.task_list_id != Some(id));
            data.task_lists.retain(|l| l.id != id);
            info!(
                "Deleted task list {} and {} tasks",
                id,
                before - data.tasks.len()
            );
            Ok(())
        })
        .await
    }

    async fn set_task_status(&self, id: u64, status: TaskStatus) -> StoreResult<Task> {
        self.mutate(move |data| {
            let task = data.task_mut(id)?;
            task.status = status;
            task.updated_at = Utc::now();
            debug!("Task {} status -> {}", id, status.title());
            Ok(task.clone())
        })
        .await
    }

    async fn set_task_priority(&self, id: u64, priority: TaskPriority) -> StoreResult<Task> {
        self.mutate(move |data| {
            let task = data.task_mut(id)?;
            task.priority = priority;
            task.updated_at = Utc::now();
            debug!("Task {} priority -> {}", id, priority.name());
            Ok(task.clone())
        })
        .await
    }
}
