use async_trait::async_trait;
use membership_validation::{
    FailureKind, FeedbackState, FieldBinding, FieldElement, FieldEvent, Result, RuleRegistry,
    ServiceSettings, StepMap, ValidationApi, ValidationContext, ValidationResult,
    ValidationService,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingElement {
    states: Mutex<Vec<FeedbackState>>,
}

impl RecordingElement {
    fn states(&self) -> Vec<FeedbackState> {
        self.states.lock().unwrap().clone()
    }
}

impl FieldElement for RecordingElement {
    fn render(&self, _field_name: &str, state: &FeedbackState) {
        self.states.lock().unwrap().push(state.clone());
    }
}

#[derive(Default)]
struct StubApi {
    emails: Mutex<Vec<String>>,
    age: Option<u64>,
    // Only this email is accepted when set.
    accepted_email: Option<&'static str>,
}

#[async_trait]
impl ValidationApi for StubApi {
    async fn validate_email(&self, value: &str) -> Result<ValidationResult> {
        self.emails.lock().unwrap().push(value.to_string());
        match self.accepted_email {
            Some(accepted) if accepted != value => Ok(ValidationResult {
                valid: false,
                message: Some(format!("{} is not accepted", value)),
                ..ValidationResult::default()
            }),
            _ => Ok(ValidationResult::ok()),
        }
    }

    async fn validate_postal_code(&self, _value: &str, _country: &str) -> Result<ValidationResult> {
        Ok(ValidationResult::ok())
    }

    async fn validate_phone_number(&self, _value: &str, _country: &str) -> Result<ValidationResult> {
        Ok(ValidationResult::ok())
    }

    async fn validate_birth_date(&self, _value: &str) -> Result<ValidationResult> {
        let result = ValidationResult::ok();
        Ok(match self.age {
            Some(age) => result.with_extra("age", serde_json::json!(age)),
            None => result,
        })
    }
}

fn bind(api: Arc<StubApi>, field: &str) -> (Arc<RecordingElement>, FieldBinding) {
    let service = ValidationService::with_defaults(api).unwrap();
    let element = Arc::new(RecordingElement::default());
    let binding =
        service.setup_real_time_validation(element.clone(), field, ValidationContext::default());
    (element, binding)
}

#[tokio::test(start_paused = true)]
async fn test_blur_shows_validating_then_result() {
    let (element, binding) = bind(Arc::new(StubApi::default()), "email");

    binding
        .handle(FieldEvent::Blur, "member@example.org")
        .expect("email goes to the remote check")
        .await
        .unwrap();

    assert_eq!(
        element.states(),
        vec![
            FeedbackState::Neutral,
            FeedbackState::Validating,
            FeedbackState::Valid { message: None },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_only_latest_keystroke_renders() {
    let api = Arc::new(StubApi::default());
    let (element, binding) = bind(api.clone(), "email");

    let handles = [
        binding.handle(FieldEvent::Input, "a@x.io"),
        binding.handle(FieldEvent::Input, "ab@x.io"),
        binding.handle(FieldEvent::Input, "abc@x.io"),
    ];
    for handle in handles.into_iter().flatten() {
        handle.await.unwrap();
    }

    assert_eq!(*api.emails.lock().unwrap(), vec!["abc@x.io".to_string()]);
    assert_eq!(
        element.states(),
        vec![FeedbackState::Neutral, FeedbackState::Valid { message: None }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_input_renders_message() {
    let (element, binding) = bind(Arc::new(StubApi::default()), "firstName");

    assert!(binding.handle(FieldEvent::Change, "J").is_none());

    let last = element.states().pop().unwrap();
    assert_eq!(
        last,
        FeedbackState::Invalid {
            message: "First name must be at least 2 characters".to_string(),
            kind: Some(FailureKind::MinLength),
        }
    );
    assert_eq!(last.css_classes(), &["is-invalid"]);
}

#[tokio::test(start_paused = true)]
async fn test_age_warning_is_rendered_without_blocking() {
    let api = Arc::new(StubApi {
        age: Some(104),
        ..StubApi::default()
    });
    let (element, binding) = bind(api, "birthDate");

    binding
        .handle(FieldEvent::Blur, "1922-01-01")
        .expect("birth date goes to the remote check")
        .await
        .unwrap();

    let last = element.states().pop().unwrap();
    assert_eq!(
        last,
        FeedbackState::Warning {
            message: "Please double-check the birth date".to_string()
        }
    );
    assert!(last.css_classes().contains(&"is-valid"));
}

#[tokio::test(start_paused = true)]
async fn test_blank_optional_field_stays_neutral() {
    let (element, binding) = bind(Arc::new(StubApi::default()), "phone");

    assert!(binding.handle(FieldEvent::Blur, "").is_none());

    assert_eq!(
        element.states(),
        vec![FeedbackState::Neutral, FeedbackState::Neutral]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_latest_keystroke_wins_across_worker_threads() {
    for run in 0..50 {
        let api = Arc::new(StubApi {
            accepted_email: Some("abc@x.io"),
            ..StubApi::default()
        });
        let settings = ServiceSettings {
            debounce: Duration::from_millis(5),
            ..ServiceSettings::default()
        };
        let service = ValidationService::new(
            api,
            RuleRegistry::membership_defaults().unwrap(),
            StepMap::membership_defaults(),
            settings,
        );
        let element = Arc::new(RecordingElement::default());
        let binding =
            service.setup_real_time_validation(element.clone(), "email", ValidationContext::default());

        let handles = [
            binding.handle(FieldEvent::Input, "a@x.io"),
            binding.handle(FieldEvent::Input, "ab@x.io"),
            binding.handle(FieldEvent::Input, "abc@x.io"),
        ];
        for handle in handles.into_iter().flatten() {
            handle.await.unwrap();
        }

        assert_eq!(
            element.states().last(),
            Some(&FeedbackState::Valid { message: None }),
            "run {} rendered a superseded value",
            run
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_sync_result_is_not_overwritten_by_older_remote_check() {
    let api = Arc::new(StubApi::default());
    let (element, binding) = bind(api.clone(), "email");

    let pending = binding.handle(FieldEvent::Input, "member@example.org");
    assert!(binding.handle(FieldEvent::Input, "member").is_none());
    if let Some(handle) = pending {
        handle.await.unwrap();
    }

    assert!(api.emails.lock().unwrap().is_empty());
    assert!(matches!(
        element.states().last(),
        Some(FeedbackState::Invalid { .. })
    ));
}
