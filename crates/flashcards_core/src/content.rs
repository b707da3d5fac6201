//! crates/flashcards_core/src/content.rs
//!
//! Length rules for flashcard text, shared by manual editing, generation and review.

use crate::domain::{BACK_MAX_LEN, FRONT_MAX_LEN};

/// Checks that `text` is non-blank and at most `max` characters.
pub fn check_text(text: &str, max: usize) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("must not be empty".to_string());
    }
    if text.chars().count() > max {
        return Err(format!("must be at most {} characters", max));
    }
    Ok(())
}

pub fn check_front(front: &str) -> Result<(), String> {
    check_text(front, FRONT_MAX_LEN)
}

pub fn check_back(back: &str) -> Result<(), String> {
    check_text(back, BACK_MAX_LEN)
}

/// Trims `text` and cuts it down to at most `max` characters.
pub fn clamp(text: &str, max: usize) -> String {
    text.trim().chars().take(max).collect()
}
