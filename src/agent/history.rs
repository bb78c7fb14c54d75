//! Conversation history management
//!
//! Bounded log of a bot's turns with a pinned system turn at position 0.

use std::collections::VecDeque;

use crate::core::Turn;

/// Default number of recent turns kept besides the pinned system turn
pub const DEFAULT_WINDOW: usize = 20;

/// Bounded, ordered conversation memory for one bot
///
/// Holds at most `window + 1` turns: the pinned system turn (if any) plus the
/// `window` most recent turns. The pinned turn is never evicted.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    /// Pinned system turn, always reported first
    pinned: Option<Turn>,
    /// Sliding window of recent turns
    turns: VecDeque<Turn>,
    /// Maximum number of non-pinned turns
    window: usize,
}

impl ConversationHistory {
    /// Create an empty history with no pinned turn
    pub fn new(window: usize) -> Self {
        Self {
            pinned: None,
            turns: VecDeque::with_capacity(window + 1),
            window,
        }
    }

    /// Create a history whose position 0 is the given system prompt
    pub fn with_system_prompt(window: usize, prompt: impl Into<String>) -> Self {
        let mut history = Self::new(window);
        history.pinned = Some(Turn::system(prompt));
        history
    }

    /// Append a turn, evicting the oldest non-pinned turns past the window
    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);

        while self.turns.len() > self.window {
            self.turns.pop_front();
        }
    }

    /// Append a user turn
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.append(Turn::user(content));
    }

    /// Append an assistant turn
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.append(Turn::assistant(content));
    }

    /// Full ordered sequence, pinned turn first
    pub fn snapshot(&self) -> Vec<Turn> {
        let mut result = Vec::with_capacity(self.len());
        if let Some(ref pinned) = self.pinned {
            result.push(pinned.clone());
        }
        result.extend(self.turns.iter().cloned());
        result
    }

    /// Drop everything except the pinned turn
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Number of turns including the pinned one
    pub fn len(&self) -> usize {
        self.turns.len() + usize::from(self.pinned.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Role;

    #[test]
    fn test_history_basic() {
        let mut history = ConversationHistory::with_system_prompt(20, "be nice");
        history.add_user("Hello");
        history.add_assistant("Hi there!");

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0], Turn::system("be nice"));
        assert_eq!(snapshot[1], Turn::user("Hello"));
        assert_eq!(snapshot[2], Turn::assistant("Hi there!"));
    }

    #[test]
    fn test_window_keeps_pinned_turn() {
        let mut history = ConversationHistory::with_system_prompt(20, "system");
        for i in 0..57 {
            history.add_user(format!("{}", i));
            let snapshot = history.snapshot();
            assert!(snapshot.len() <= 21);
            assert_eq!(snapshot[0].role, Role::System);
        }

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 21);
        assert_eq!(snapshot[1].content, "37");
        assert_eq!(snapshot[20].content, "56");
    }

    #[test]
    fn test_window_without_pinned_turn() {
        let mut history = ConversationHistory::new(3);
        history.add_user("1");
        history.add_assistant("2");
        history.add_user("3");
        history.add_assistant("4");

        // N + 1 bound still holds; nothing pinned so only the window remains
        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].content, "2");
    }

    #[test]
    fn test_reset_restores_pinned_turn() {
        let mut history = ConversationHistory::with_system_prompt(5, "system");
        history.add_user("a");
        history.add_assistant("b");
        history.reset();
        assert_eq!(history.snapshot(), vec![Turn::system("system")]);

        let mut unpinned = ConversationHistory::new(5);
        unpinned.add_user("a");
        unpinned.reset();
        assert!(unpinned.snapshot().is_empty());
        assert!(unpinned.is_empty());
    }

    #[test]
    fn test_zero_window() {
        let mut history = ConversationHistory::with_system_prompt(0, "system");
        history.add_user("dropped");
        assert_eq!(history.snapshot(), vec![Turn::system("system")]);
    }
}
