//! Todo Today library exports for testing

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::action::ScreenRequest;

pub mod core;
pub mod screens;
pub mod store;
pub mod tui;

#[cfg(test)]
pub mod test_support;

/// The first screen shown, and where `go_back` lands with no history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartScreen {
    #[default]
    Home,
    Lists,
    Today,
}

impl StartScreen {
    pub fn request(self) -> ScreenRequest {
        match self {
            StartScreen::Home => ScreenRequest::Home,
            StartScreen::Lists => ScreenRequest::TaskLists,
            StartScreen::Today => ScreenRequest::todays_tasks(),
        }
    }
}
