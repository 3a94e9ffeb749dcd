use crate::core::service::{FieldCheck, ValidationService};
use crate::domain::model::{FailureKind, ValidationContext, ValidationResult};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEvent {
    Input,
    Change,
    Blur,
}

/// What a bound input shows next to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackState {
    Neutral,
    Validating,
    Valid { message: Option<String> },
    Warning { message: String },
    Invalid { message: String, kind: Option<FailureKind> },
}

impl FeedbackState {
    /// Warnings win over a plain valid state; an empty optional field stays
    /// neutral.
    pub fn from_result(value: &str, result: &ValidationResult) -> Self {
        if !result.valid {
            return FeedbackState::Invalid {
                message: result
                    .message
                    .clone()
                    .unwrap_or_else(|| "Invalid value".to_string()),
                kind: result.kind,
            };
        }

        if let Some(warning) = &result.warning {
            return FeedbackState::Warning {
                message: warning.clone(),
            };
        }

        if value.trim().is_empty() {
            return FeedbackState::Neutral;
        }

        FeedbackState::Valid {
            message: result.message.clone(),
        }
    }

    pub fn css_classes(&self) -> &'static [&'static str] {
        match self {
            FeedbackState::Neutral => &[],
            FeedbackState::Validating => &["is-validating"],
            FeedbackState::Valid { .. } => &["is-valid"],
            FeedbackState::Warning { .. } => &["is-valid", "has-warning"],
            FeedbackState::Invalid { .. } => &["is-invalid"],
        }
    }

    pub fn feedback_text(&self) -> Option<&str> {
        match self {
            FeedbackState::Neutral => None,
            FeedbackState::Validating => Some("Validating..."),
            FeedbackState::Valid { message } => message.as_deref(),
            FeedbackState::Warning { message } | FeedbackState::Invalid { message, .. } => {
                Some(message)
            }
        }
    }
}

/// Presentation surface of one input (classes plus a feedback line).
pub trait FieldElement: Send + Sync {
    fn render(&self, field_name: &str, state: &FeedbackState);
}

/// An input wired to the validation service. Handling an event never touches
/// form data, only what the element renders.
#[derive(Clone)]
pub struct FieldBinding {
    service: ValidationService,
    element: Arc<dyn FieldElement>,
    field_name: String,
    context: ValidationContext,
    // Generation of the most recent event; older events never render.
    latest: Arc<Mutex<u64>>,
}

impl FieldBinding {
    pub(crate) fn new(
        service: ValidationService,
        element: Arc<dyn FieldElement>,
        field_name: &str,
        context: ValidationContext,
    ) -> Self {
        element.render(field_name, &FeedbackState::Neutral);
        Self {
            service,
            element,
            field_name: field_name.to_string(),
            context,
            latest: Arc::new(Mutex::new(0)),
        }
    }

    /// 同步完成的檢查直接渲染並回傳 `None`；需要遠端驗證時，計時器在回傳前
    /// 就已排定，背景任務只負責等待與渲染。
    pub fn handle(&self, event: FieldEvent, value: &str) -> Option<JoinHandle<()>> {
        let generation = {
            let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
            *latest += 1;
            *latest
        };

        let is_async = self
            .service
            .get_rule(&self.field_name)
            .is_some_and(|rule| rule.is_async);
        if event == FieldEvent::Blur && is_async && !value.trim().is_empty() {
            self.render_if_latest(generation, &FeedbackState::Validating);
        }

        let ticket = match self.service.begin_field(&self.field_name, value) {
            FieldCheck::Done(result) => {
                self.render_if_latest(generation, &FeedbackState::from_result(value, &result));
                return None;
            }
            FieldCheck::Scheduled(ticket) => ticket,
        };

        let binding = self.clone();
        let value = value.to_string();
        Some(tokio::spawn(async move {
            let result = binding
                .service
                .finish_field(&binding.field_name, &value, &binding.context, ticket)
                .await;

            match result {
                Some(result) => {
                    let state = FeedbackState::from_result(&value, &result);
                    tracing::debug!("🖊️ {} ({:?}): {:?}", binding.field_name, event, state);
                    binding.render_if_latest(generation, &state);
                }
                None => tracing::debug!("🖊️ {} ({:?}): superseded", binding.field_name, event),
            }
        }))
    }

    fn render_if_latest(&self, generation: u64, state: &FeedbackState) {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if *latest == generation {
            self.element.render(&self.field_name, state);
        }
    }
}
