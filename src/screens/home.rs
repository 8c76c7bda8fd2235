use std::sync::Arc;

use crate::core::action::{Action, ScreenRequest};
use crate::core::content::{Content, FormInput, Intent, Node};
use crate::core::screen::{Lifecycle, ScreenKind, ScreenView, navigation_intent};
use crate::store::{Query, SortKey, SortOrder, find_one_task_list};

use super::{ScreenContext, spawn_store_op};

#[derive(Debug, Default)]
pub struct HomeView {
    resolving: bool,
    error: Option<String>,
}

/// Landing screen: jump to the most recent list or start a new one.
pub struct HomeScreen {
    lifecycle: Arc<Lifecycle<HomeView>>,
    ctx: ScreenContext,
}

impl HomeScreen {
    pub fn new(ctx: ScreenContext) -> Self {
        Self {
            lifecycle: Arc::new(Lifecycle::new(&ctx.ids, "home", ScreenKind::Home, HomeView::default())),
            ctx,
        }
    }

    fn open_latest_list(&self) -> Option<Action> {
        let token = self.lifecycle.token()?;
        self.lifecycle.update(|view| {
            view.resolving = true;
            view.error = None;
        });

        let store = self.ctx.store.clone();
        let lookup = token.clone();
        spawn_store_op(
            &self.lifecycle,
            &self.ctx.dispatcher,
            &token,
            async move {
                let query = Query::new().sort(SortKey::Date, SortOrder::Desc);
                find_one_task_list(store.as_ref(), &query, &lookup).await
            },
            |view, result| {
                view.resolving = false;
                match result {
                    Ok(Some(list)) => Some(Action::Show(ScreenRequest::tasks_in_list(&list))),
                    Ok(None) => Some(Action::Show(ScreenRequest::MutateTaskList(None))),
                    Err(e) => {
                        view.error = Some(format!("Could not find the latest list: {e}"));
                        None
                    }
                }
            },
        );
        Some(Action::Refresh)
    }
}

impl ScreenView for HomeScreen {
    type View = HomeView;

    fn lifecycle(&self) -> &Lifecycle<HomeView> {
        &self.lifecycle
    }

    fn prepare(&self, view: &mut HomeView) {
        *view = HomeView::default();
    }

    fn compose(&self, view: &HomeView) -> Content {
        let mut content = Content::new("Todo Today")
            .with(Node::Header("Todo Today".to_string()))
            .with(Node::Muted("One list a day.".to_string()))
            .with(Node::Separator)
            .with(Node::button("Today's List", Intent::OpenLatestList))
            .with(Node::button(
                "Create List",
                Intent::Navigate(ScreenRequest::MutateTaskList(None)),
            ))
            .with(Node::button("Menu", Intent::Navigate(ScreenRequest::Navigation)));
        if view.resolving {
            content.push(Node::Loading("Finding the latest list...".to_string()));
        }
        content.with_error(view.error.clone())
    }

    fn on_intent(&self, intent: Intent, _input: &FormInput) -> Option<Action> {
        match intent {
            Intent::OpenLatestList => self.open_latest_list(),
            other => navigation_intent(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::TaskList;
    use crate::core::screen::Screen;
    use crate::store::DataStore;
    use crate::test_support::{next_dispatch, test_context};

    #[tokio::test]
    async fn test_latest_list_without_lists_opens_create_list() {
        let (ctx, rx) = test_context();
        let home = HomeScreen::new(ctx);
        home.foreground();

        let action = home.handle(Intent::OpenLatestList, &FormInput::default());
        assert_eq!(action, Some(Action::Refresh));
        let dispatch = next_dispatch(&rx).await;
        assert_eq!(dispatch.action, Action::Show(ScreenRequest::MutateTaskList(None)));
    }

    #[tokio::test]
    async fn test_latest_list_picks_most_recent_date() {
        let (ctx, rx) = test_context();
        let mut older = TaskList::draft("Monday", "");
        older.date = chrono::Utc::now() - chrono::Duration::days(1);
        ctx.store.save_task_list(older).await.unwrap();
        let newest = ctx
            .store
            .save_task_list(TaskList::draft("Tuesday", ""))
            .await
            .unwrap();

        let home = HomeScreen::new(ctx);
        home.foreground();
        home.handle(Intent::OpenLatestList, &FormInput::default());

        let dispatch = next_dispatch(&rx).await;
        assert_eq!(
            dispatch.action,
            Action::Show(ScreenRequest::tasks_in_list(&newest))
        );
    }

    #[test]
    fn test_compose_offers_entry_points() {
        let (ctx, _rx) = test_context();
        let home = HomeScreen::new(ctx);
        let content = home.content();
        assert_eq!(content.focusable().len(), 3);
        assert!(content.error.is_none());
    }
}
