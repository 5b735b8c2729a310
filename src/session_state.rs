//! Per-user mutable session state.
//!
//! One typed struct per user session instead of loose string-keyed state:
//! named fields with defaults, constructed once, passed explicitly through
//! the call chain. The one-shot fields (pending inquiry, selected
//! suggestion, regenerate request) expose `take`-style accessors that clear
//! on read, so a value can never be consumed twice.

use crate::inquiry::ExtractedInquiry;

/// Mutable state for one user session. Not persisted; reset on logout.
#[derive(Debug, Default)]
pub struct SessionState {
    initialized: bool,
    /// The thread the user is currently looking at.
    pub current_thread: Option<String>,
    /// Blocks a second generation while one is in flight.
    pub busy: bool,
    pending_inquiry: Option<ExtractedInquiry>,
    selected_suggestion: Option<usize>,
    regenerate_requested: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-time setup hook. Idempotent: the first call initializes, every
    /// later call is a no-op.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        true
    }

    /// Queue an OCR inquiry for the next question flow.
    pub fn set_pending_inquiry(&mut self, inquiry: ExtractedInquiry) {
        self.pending_inquiry = Some(inquiry);
    }

    /// Consume the pending inquiry, clearing it.
    pub fn take_pending_inquiry(&mut self) -> Option<ExtractedInquiry> {
        self.pending_inquiry.take()
    }

    /// Record which suggestion the user picked.
    pub fn select_suggestion(&mut self, index: usize) {
        self.selected_suggestion = Some(index);
    }

    /// Consume the selected-suggestion index, clearing it.
    pub fn take_selected_suggestion(&mut self) -> Option<usize> {
        self.selected_suggestion.take()
    }

    /// Ask for the next generation to bypass the cache.
    pub fn request_regenerate(&mut self) {
        self.regenerate_requested = true;
    }

    /// Consume the regenerate request. True at most once per request.
    pub fn take_regenerate(&mut self) -> bool {
        std::mem::take(&mut self.regenerate_requested)
    }

    /// Wipe everything back to defaults. Called on logout.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let mut state = SessionState::new();
        assert!(state.initialize());
        assert!(!state.initialize());
        assert!(!state.initialize());
    }

    #[test]
    fn test_pending_inquiry_one_shot() {
        let mut state = SessionState::new();
        state.set_pending_inquiry(ExtractedInquiry {
            inquiry: "where is my order".to_string(),
            success: true,
            ..Default::default()
        });

        let taken = state.take_pending_inquiry().unwrap();
        assert_eq!(taken.inquiry, "where is my order");
        assert!(state.take_pending_inquiry().is_none());
    }

    #[test]
    fn test_selected_suggestion_one_shot() {
        let mut state = SessionState::new();
        state.select_suggestion(1);
        assert_eq!(state.take_selected_suggestion(), Some(1));
        assert_eq!(state.take_selected_suggestion(), None);
    }

    #[test]
    fn test_regenerate_one_shot() {
        let mut state = SessionState::new();
        assert!(!state.take_regenerate());
        state.request_regenerate();
        assert!(state.take_regenerate());
        assert!(!state.take_regenerate());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = SessionState::new();
        state.initialize();
        state.current_thread = Some("CNV_x".to_string());
        state.busy = true;
        state.request_regenerate();
        state.select_suggestion(0);

        state.reset();
        assert!(state.current_thread.is_none());
        assert!(!state.busy);
        assert!(!state.take_regenerate());
        assert!(state.take_selected_suggestion().is_none());
        // Reset state can be initialized again.
        assert!(state.initialize());
    }
}
