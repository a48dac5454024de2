//! Outbound inline keyboards.

use serde::{Deserialize, Serialize};

/// A single inline button as the messaging collaborator renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub title: String,
    /// Opaque payload echoed back in the matching [`crate::ButtonPress`].
    pub payload: String,
}

impl KeyboardButton {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            payload: payload.into(),
        }
    }
}

/// Rows of buttons, each row rendered left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<KeyboardButton>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<KeyboardButton>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// Iterates over every button in row order.
    pub fn buttons(&self) -> impl Iterator<Item = &KeyboardButton> {
        self.rows.iter().flatten()
    }
}

/// Handle to a message the collaborator has sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle {
    pub message_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_with_empty_rows_is_empty() {
        assert!(Keyboard::new(vec![vec![], vec![]]).is_empty());
        assert!(Keyboard::default().is_empty());
    }

    #[test]
    fn buttons_iterate_in_row_order() {
        let keyboard = Keyboard::new(vec![
            vec![KeyboardButton::new("a", "1"), KeyboardButton::new("b", "2")],
            vec![KeyboardButton::new("c", "3")],
        ]);
        let titles: Vec<_> = keyboard.buttons().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["a", "b", "c"]);
    }
}
