//! The [`Renderer`] the TUI hands to the navigation controller.
//!
//! The controller presents on the UI thread, in the middle of handling an
//! event; drawing happens later in the loop. `FrameSlot` keeps only the
//! latest presentation until the loop takes it to draw.

use std::sync::{Arc, Mutex};

use crate::core::navigation::{Presentation, Renderer};

#[derive(Clone, Default)]
pub struct FrameSlot {
    latest: Arc<Mutex<Option<Presentation>>>,
}

impl FrameSlot {
    /// The presentation received since the last call, if any.
    pub fn take(&self) -> Option<Presentation> {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl Renderer for FrameSlot {
    fn present(&mut self, presentation: Presentation) {
        log::debug!(
            "Presenting {} (generation {}, {} overlays)",
            presentation.screen,
            presentation.generation,
            presentation.overlays.len()
        );
        *self
            .latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(presentation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::Content;
    use crate::core::screen::ScreenKind;

    fn presentation(screen: &str, generation: u64) -> Presentation {
        Presentation {
            screen_id: 1,
            screen: screen.to_string(),
            kind: ScreenKind::Custom,
            generation,
            content: Content::new(screen),
            overlays: Vec::new(),
        }
    }

    #[test]
    fn test_take_returns_latest_once() {
        let slot = FrameSlot::default();
        let mut renderer = slot.clone();
        renderer.present(presentation("a", 1));
        renderer.present(presentation("b", 1));

        assert_eq!(slot.take().unwrap().screen, "b");
        assert!(slot.take().is_none());
    }
}
