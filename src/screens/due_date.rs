use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Local, Utc};

use crate::core::action::Action;
use crate::core::content::{Content, FormInput, Intent, Node};
use crate::core::model::format_due_date;
use crate::core::screen::{Lifecycle, ScreenIds, ScreenKind, ScreenView, navigation_intent};

/// Due date shared between the task form and its picker.
#[derive(Debug, Clone, Default)]
pub struct DueDateCell(Arc<Mutex<Option<DateTime<Utc>>>>);

impl DueDateCell {
    pub fn new(value: Option<DateTime<Utc>>) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, value: Option<DateTime<Utc>>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// Child of the task form. Edits a draft and writes it to the cell on Save.
pub struct DueDateScreen {
    lifecycle: Lifecycle<Option<DateTime<Utc>>>,
    cell: DueDateCell,
}

impl DueDateScreen {
    pub fn new(ids: &ScreenIds, cell: DueDateCell) -> Self {
        Self {
            lifecycle: Lifecycle::new(ids, "due date picker", ScreenKind::DueDatePicker, None),
            cell,
        }
    }

    fn edit(&self, f: impl FnOnce(DateTime<Utc>) -> Option<DateTime<Utc>>) -> Option<Action> {
        self.lifecycle
            .update(|draft| *draft = f(draft.unwrap_or_else(Utc::now)))?;
        Some(Action::Refresh)
    }
}

impl ScreenView for DueDateScreen {
    type View = Option<DateTime<Utc>>;

    fn lifecycle(&self) -> &Lifecycle<Self::View> {
        &self.lifecycle
    }

    fn prepare(&self, draft: &mut Self::View) {
        *draft = self.cell.get();
    }

    fn compose(&self, draft: &Self::View) -> Content {
        let shown = draft
            .map(format_due_date)
            .unwrap_or_else(|| "None".to_string());
        Content::new("Due Date")
            .with(Node::field("Due", shown))
            .with(Node::Row(vec![
                Node::button("-1 day", Intent::ShiftDueDays(-1)),
                Node::button("+1 day", Intent::ShiftDueDays(1)),
                Node::button("-1 hour", Intent::ShiftDueHours(-1)),
                Node::button("+1 hour", Intent::ShiftDueHours(1)),
            ]))
            .with(Node::Row(vec![
                Node::button("Today", Intent::DueToday),
                Node::button("Clear", Intent::ClearDue),
            ]))
            .with(Node::Separator)
            .with(Node::Row(vec![
                Node::button("Save", Intent::Save),
                Node::button("Cancel", Intent::Dismiss),
            ]))
    }

    fn on_intent(&self, intent: Intent, _input: &FormInput) -> Option<Action> {
        match intent {
            Intent::ShiftDueDays(days) => self.edit(|at| Some(at + Duration::days(days))),
            Intent::ShiftDueHours(hours) => self.edit(|at| Some(at + Duration::hours(hours))),
            Intent::DueToday => self.edit(|at| {
                // Keep the time of day, move to today's local date
                let local = at.with_timezone(&Local);
                let today = Local::now().date_naive();
                let shifted = today.and_time(local.time()).and_local_timezone(Local).earliest();
                Some(shifted.map_or(at, |t| t.with_timezone(&Utc)))
            }),
            Intent::ClearDue => {
                self.lifecycle.update(|draft| *draft = None)?;
                Some(Action::Refresh)
            }
            Intent::Save => {
                let draft = self.lifecycle.with_view(|draft| *draft);
                self.cell.set(draft);
                Some(Action::CloseChild)
            }
            other => navigation_intent(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::screen::Screen;
    use chrono::TimeZone;

    #[test]
    fn test_save_writes_cell_and_closes() {
        let start = Utc.with_ymd_and_hms(2031, 5, 1, 9, 0, 0).unwrap();
        let cell = DueDateCell::new(Some(start));
        let picker = DueDateScreen::new(&ScreenIds::default(), cell.clone());
        picker.foreground();

        let none = FormInput::default();
        assert_eq!(picker.handle(Intent::ShiftDueDays(2), &none), Some(Action::Refresh));
        assert_eq!(picker.handle(Intent::ShiftDueHours(-1), &none), Some(Action::Refresh));
        // Not saved yet
        assert_eq!(cell.get(), Some(start));

        assert_eq!(picker.handle(Intent::Save, &none), Some(Action::CloseChild));
        assert_eq!(
            cell.get(),
            Some(start + Duration::days(2) - Duration::hours(1))
        );
    }

    #[test]
    fn test_cancel_leaves_cell_untouched() {
        let cell = DueDateCell::new(None);
        let picker = DueDateScreen::new(&ScreenIds::default(), cell.clone());
        picker.foreground();
        picker.handle(Intent::ShiftDueDays(1), &FormInput::default());
        assert_eq!(
            picker.handle(Intent::Dismiss, &FormInput::default()),
            Some(Action::CloseChild)
        );
        assert_eq!(cell.get(), None);
    }

    #[test]
    fn test_clear_then_save_removes_due_date() {
        let cell = DueDateCell::new(Some(Utc::now()));
        let picker = DueDateScreen::new(&ScreenIds::default(), cell.clone());
        picker.foreground();
        picker.handle(Intent::ClearDue, &FormInput::default());
        assert!(picker.content().nodes.contains(&Node::field("Due", "None")));
        picker.handle(Intent::Save, &FormInput::default());
        assert_eq!(cell.get(), None);
    }

    #[test]
    fn test_today_moves_date_to_today() {
        let cell = DueDateCell::new(Some(Utc::now() + Duration::days(10)));
        let picker = DueDateScreen::new(&ScreenIds::default(), cell.clone());
        picker.foreground();
        picker.handle(Intent::DueToday, &FormInput::default());
        picker.handle(Intent::Save, &FormInput::default());
        let saved = cell.get().unwrap().with_timezone(&Local).date_naive();
        assert_eq!(saved, Local::now().date_naive());
    }
}
