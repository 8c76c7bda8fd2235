//! # Data Store
//!
//! The persistence seam. Screens talk to a [`DataStore`] trait object, never
//! to a concrete backend.
//!
//! Queries are built from [`Directive`]s and are cooperative with activation
//! tokens: every call takes the caller's [`ActivationToken`] and returns
//! [`StoreError::Cancelled`] once the activation is over.
//!
//! ## Query semantics
//!
//! - Filters are ANDed.
//! - Sorts accumulate like `ORDER BY`: the first sort directive is the
//!   primary key, later ones break ties.
//! - The last `Limit` wins, and applies after filtering and sorting.
//! - `count` ignores sorts, limits and preloads.
//! - A filter, sort key or preload that doesn't apply to the queried kind
//!   is an [`StoreError::InvalidQuery`].

pub mod json;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::core::model::{Task, TaskList, TaskPriority, TaskStatus};
use crate::core::token::{ActivationToken, Cancelled};

pub use json::JsonStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    TaskList,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Task => write!(f, "task"),
            EntityKind::TaskList => write!(f, "task list"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query cancelled")]
    Cancelled,
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("{0}")]
    Validation(String),
    #[error("data file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("data file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cancelled)
    }
}

impl From<Cancelled> for StoreError {
    fn from(_: Cancelled) -> Self {
        StoreError::Cancelled
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Task(Task),
    TaskList(TaskList),
}

impl Record {
    pub fn into_task(self) -> Option<Task> {
        match self {
            Record::Task(task) => Some(task),
            Record::TaskList(_) => None,
        }
    }

    pub fn into_task_list(self) -> Option<TaskList> {
        match self {
            Record::TaskList(list) => Some(list),
            Record::Task(_) => None,
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Id(u64),
    /// Tasks belonging to the list.
    TaskList(u64),
    /// Tasks whose status is any of these.
    Status(Vec<TaskStatus>),
    /// Tasks due on this local calendar day.
    DueOn(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Label,
    CreatedAt,
    /// Lists only.
    Date,
    /// Tasks only. Tasks without a due date sort last.
    DueDate,
    /// Tasks only.
    Order,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Fill [`Task::task_list`].
    TaskList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Filter(Filter),
    Sort(SortKey, SortOrder),
    Limit(usize),
    Preload(Relation),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    directives: Vec<Directive>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.directives.push(Directive::Filter(filter));
        self
    }

    pub fn sort(mut self, key: SortKey, order: SortOrder) -> Self {
        self.directives.push(Directive::Sort(key, order));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.directives.push(Directive::Limit(n));
        self
    }

    pub fn preload(mut self, relation: Relation) -> Self {
        self.directives.push(Directive::Preload(relation));
        self
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Folds the directives into what a backend executes.
    pub fn plan(&self) -> QueryPlan {
        let mut plan = QueryPlan::default();
        for directive in &self.directives {
            match directive {
                Directive::Filter(filter) => plan.filters.push(filter.clone()),
                Directive::Sort(key, order) => plan.sorts.push((*key, *order)),
                Directive::Limit(n) => plan.limit = Some(*n),
                Directive::Preload(relation) => {
                    if !plan.preloads.contains(relation) {
                        plan.preloads.push(*relation);
                    }
                }
            }
        }
        plan
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    pub filters: Vec<Filter>,
    pub sorts: Vec<(SortKey, SortOrder)>,
    pub limit: Option<usize>,
    pub preloads: Vec<Relation>,
}

impl QueryPlan {
    /// Rejects directives that make no sense for `kind`.
    pub fn validate(&self, kind: EntityKind) -> StoreResult<()> {
        if kind == EntityKind::TaskList {
            for filter in &self.filters {
                if !matches!(filter, Filter::Id(_)) {
                    return Err(StoreError::InvalidQuery(format!(
                        "{filter:?} does not apply to task lists"
                    )));
                }
            }
            for (key, _) in &self.sorts {
                if matches!(key, SortKey::DueDate | SortKey::Order) {
                    return Err(StoreError::InvalidQuery(format!(
                        "cannot sort task lists by {key:?}"
                    )));
                }
            }
            if let Some(relation) = self.preloads.first() {
                return Err(StoreError::InvalidQuery(format!(
                    "task lists have no {relation:?} relation"
                )));
            }
        } else {
            for (key, _) in &self.sorts {
                if *key == SortKey::Date {
                    return Err(StoreError::InvalidQuery(
                        "cannot sort tasks by Date".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// The trait
// ============================================================================

#[async_trait]
pub trait DataStore: Send + Sync {
    async fn count(&self, kind: EntityKind, query: &Query, token: &ActivationToken) -> StoreResult<u64>;

    async fn find(
        &self,
        kind: EntityKind,
        query: &Query,
        token: &ActivationToken,
    ) -> StoreResult<Vec<Record>>;

    /// Inserts when `task.id == 0`, updates otherwise. Returns the stored task.
    async fn save_task(&self, task: Task) -> StoreResult<Task>;

    async fn save_task_list(&self, list: TaskList) -> StoreResult<TaskList>;

    async fn delete_task(&self, id: u64) -> StoreResult<()>;

    /// Deletes the list and every task in it.
    async fn delete_task_list(&self, id: u64) -> StoreResult<()>;

    async fn set_task_status(&self, id: u64, status: TaskStatus) -> StoreResult<Task>;

    async fn set_task_priority(&self, id: u64, priority: TaskPriority) -> StoreResult<Task>;
}

pub type SharedStore = Arc<dyn DataStore>;

pub async fn find_tasks(
    store: &dyn DataStore,
    query: &Query,
    token: &ActivationToken,
) -> StoreResult<Vec<Task>> {
    let records = store.find(EntityKind::Task, query, token).await?;
    Ok(records.into_iter().filter_map(Record::into_task).collect())
}

pub async fn find_task_lists(
    store: &dyn DataStore,
    query: &Query,
    token: &ActivationToken,
) -> StoreResult<Vec<TaskList>> {
    let records = store.find(EntityKind::TaskList, query, token).await?;
    Ok(records.into_iter().filter_map(Record::into_task_list).collect())
}

pub async fn find_one_task_list(
    store: &dyn DataStore,
    query: &Query,
    token: &ActivationToken,
) -> StoreResult<Option<TaskList>> {
    let query = query.clone().limit(1);
    Ok(find_task_lists(store, &query, token).await?.into_iter().next())
}

/// The list a task belongs to, using the preloaded one when present.
pub async fn list_for_task(
    store: &dyn DataStore,
    task: &Task,
    token: &ActivationToken,
) -> StoreResult<Option<TaskList>> {
    if let Some(list) = &task.task_list {
        return Ok(Some(list.clone()));
    }
    match task.task_list_id {
        Some(id) => find_one_task_list(store, &Query::new().filter(Filter::Id(id)), token).await,
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_last_limit_wins() {
        let plan = Query::new().limit(5).limit(2).plan();
        assert_eq!(plan.limit, Some(2));
    }

    #[test]
    fn test_plan_sorts_accumulate_in_order() {
        let plan = Query::new()
            .sort(SortKey::DueDate, SortOrder::Asc)
            .sort(SortKey::Id, SortOrder::Desc)
            .plan();
        assert_eq!(
            plan.sorts,
            vec![(SortKey::DueDate, SortOrder::Asc), (SortKey::Id, SortOrder::Desc)]
        );
    }

    #[test]
    fn test_plan_dedups_preloads() {
        let plan = Query::new()
            .preload(Relation::TaskList)
            .preload(Relation::TaskList)
            .plan();
        assert_eq!(plan.preloads, vec![Relation::TaskList]);
    }

    #[test]
    fn test_task_filters_rejected_for_lists() {
        let plan = Query::new().filter(Filter::TaskList(1)).plan();
        assert!(matches!(
            plan.validate(EntityKind::TaskList),
            Err(StoreError::InvalidQuery(_))
        ));
        assert!(plan.validate(EntityKind::Task).is_ok());
    }

    #[test]
    fn test_list_sort_rejected_for_tasks() {
        let plan = Query::new().sort(SortKey::Date, SortOrder::Desc).plan();
        assert!(plan.validate(EntityKind::Task).is_err());
        assert!(plan.validate(EntityKind::TaskList).is_ok());
    }

    #[test]
    fn test_cancelled_converts() {
        let err: StoreError = Cancelled.into();
        assert!(err.is_cancelled());
    }
}
