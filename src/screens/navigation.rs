use crate::core::action::ScreenRequest;
use crate::core::content::{Content, Intent, Node};
use crate::core::screen::{Lifecycle, ScreenIds, ScreenKind, ScreenView};

/// The menu. Stateless apart from its lifecycle.
pub struct NavigationScreen {
    lifecycle: Lifecycle<()>,
}

impl NavigationScreen {
    pub fn new(ids: &ScreenIds) -> Self {
        Self {
            lifecycle: Lifecycle::new(ids, "navigation", ScreenKind::Navigation, ()),
        }
    }
}

impl ScreenView for NavigationScreen {
    type View = ();

    fn lifecycle(&self) -> &Lifecycle<()> {
        &self.lifecycle
    }

    fn compose(&self, _view: &()) -> Content {
        Content::new("Navigation")
            .with(Node::button("Home", Intent::Navigate(ScreenRequest::Home)))
            .with(Node::Separator)
            .with(Node::button("Lists", Intent::Navigate(ScreenRequest::TaskLists)))
            .with(Node::Separator)
            .with(Node::button(
                "Today's Tasks",
                Intent::Navigate(ScreenRequest::todays_tasks()),
            ))
            .with(Node::button(
                "Todo Tasks",
                Intent::Navigate(ScreenRequest::todo_tasks()),
            ))
            .with(Node::button(
                "Done Tasks",
                Intent::Navigate(ScreenRequest::done_tasks()),
            ))
            .with(Node::Separator)
            .with(Node::button("Back", Intent::GoBack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::Action;
    use crate::core::content::FormInput;
    use crate::core::screen::Screen;

    #[test]
    fn test_menu_buttons_navigate() {
        let menu = NavigationScreen::new(&ScreenIds::default());
        let content = menu.foreground().unwrap();
        let labels: Vec<String> = content
            .focusable()
            .iter()
            .filter_map(|node| match node {
                Node::Button { label, .. } => Some(label.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            labels,
            vec!["Home", "Lists", "Today's Tasks", "Todo Tasks", "Done Tasks", "Back"]
        );

        let action = menu.handle(
            Intent::Navigate(ScreenRequest::TaskLists),
            &FormInput::default(),
        );
        assert_eq!(action, Some(Action::Show(ScreenRequest::TaskLists)));
    }
}
