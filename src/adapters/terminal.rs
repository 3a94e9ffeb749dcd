use crate::core::binder::{FeedbackState, FieldElement};
use std::io::Write;

/// Renders feedback as one line per state change on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalElement;

impl TerminalElement {
    pub fn line(field_name: &str, state: &FeedbackState) -> String {
        let icon = match state {
            FeedbackState::Neutral => "·",
            FeedbackState::Validating => "⏳",
            FeedbackState::Valid { .. } => "✅",
            FeedbackState::Warning { .. } => "⚠️",
            FeedbackState::Invalid { .. } => "❌",
        };
        let classes = state.css_classes().join(" ");

        match state.feedback_text() {
            Some(text) => format!("{} {} [{}] {}", icon, field_name, classes, text),
            None => format!("{} {} [{}]", icon, field_name, classes),
        }
    }
}

impl FieldElement for TerminalElement {
    fn render(&self, field_name: &str, state: &FeedbackState) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", Self::line(field_name, state)) {
            tracing::warn!("Could not write feedback: {}", e);
        }
    }
}
