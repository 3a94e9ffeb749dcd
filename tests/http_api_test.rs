use anyhow::Result;
use httpmock::prelude::*;
use membership_validation::adapters::http::RemoteMethods;
use membership_validation::{
    FailureKind, FormData, HttpValidationApi, RuleRegistry, ServiceSettings, StepMap,
    ValidationApi, ValidationContext, ValidationService, ValidatorConfig, ValidatorError,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn fast_service(api: HttpValidationApi) -> ValidationService {
    let settings = ServiceSettings {
        debounce: Duration::from_millis(10),
        request_timeout: Some(Duration::from_secs(2)),
        ..ServiceSettings::default()
    };
    ValidationService::new(
        Arc::new(api),
        RuleRegistry::membership_defaults().unwrap(),
        StepMap::membership_defaults(),
        settings,
    )
}

#[tokio::test]
async fn test_email_check_unwraps_message_envelope() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/validate_email")
                .json_body(json!({"email": "taken@example.org"}));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "message": {"valid": false, "message": "This email is already registered"}
                }));
        })
        .await;

    let api = HttpValidationApi::new(server.base_url());
    let result = api.validate_email("taken@example.org").await?;

    mock.assert_async().await;
    assert!(!result.valid);
    assert_eq!(
        result.message.as_deref(),
        Some("This email is already registered")
    );
    Ok(())
}

#[tokio::test]
async fn test_postal_code_sends_country_and_keeps_suggestions() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/validate_postal_code")
                .json_body(json!({"postal_code": "3511AB", "country": "NL"}));
            then.status(200).json_body(json!({
                "valid": true,
                "suggested_chapters": [{"name": "Utrecht", "distance_km": 0}]
            }));
        })
        .await;

    let api = HttpValidationApi::new(server.base_url());
    let result = api.validate_postal_code("3511AB", "NL").await?;

    mock.assert_async().await;
    assert!(result.valid);
    assert_eq!(result.extra["suggested_chapters"][0]["name"], "Utrecht");
    Ok(())
}

#[tokio::test]
async fn test_custom_method_names_and_headers() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/verenigingen.api.validate_birth_date")
                .header("Authorization", "token key:secret");
            then.status(200)
                .json_body(json!({"message": {"valid": true, "age": 34}}));
        })
        .await;

    let methods = RemoteMethods {
        birth_date: "verenigingen.api.validate_birth_date".to_string(),
        ..RemoteMethods::default()
    };
    let headers = HashMap::from([("Authorization".to_string(), "token key:secret".to_string())]);
    let api = HttpValidationApi::new(server.base_url())
        .with_methods(methods)
        .with_headers(headers);

    let result = api.validate_birth_date("1990-04-12").await?;

    mock.assert_async().await;
    assert_eq!(result.age(), Some(34));
    Ok(())
}

#[tokio::test]
async fn test_error_status_is_reported() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/validate_phone_number");
            then.status(403);
        })
        .await;

    let api = HttpValidationApi::new(server.base_url());
    let err = api
        .validate_phone_number("+31 6 1234 5678", "NL")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ValidatorError::RemoteStatusError { status: 403, .. }
    ));
    Ok(())
}

#[tokio::test]
async fn test_service_turns_server_error_into_network_result() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/validate_email");
            then.status(500);
        })
        .await;

    let service = fast_service(HttpValidationApi::new(server.base_url()));
    let result = service
        .validate_field("email", "x@y.com", &ValidationContext::default())
        .await
        .expect("single request is never superseded");

    mock.assert_async().await;
    assert!(!result.valid);
    assert_eq!(result.kind, Some(FailureKind::Network));
    assert_eq!(service.get_validation_stats().network_failures, 1);
    Ok(())
}

#[tokio::test]
async fn test_slow_backend_hits_service_timeout() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/validate_email");
            then.status(200)
                .delay(Duration::from_secs(5))
                .json_body(json!({"valid": true}));
        })
        .await;

    let service = fast_service(HttpValidationApi::new(server.base_url()));
    let result = service
        .validate_field("email", "slow@example.org", &ValidationContext::default())
        .await
        .unwrap();

    assert!(result.is_network_failure());
    Ok(())
}

#[tokio::test]
async fn test_step_one_end_to_end_with_config() -> Result<()> {
    let server = MockServer::start_async().await;
    let email_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/validate_email");
            then.status(200).json_body(json!({"message": {"valid": true}}));
        })
        .await;
    let birth_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/validate_birth_date");
            then.status(200)
                .json_body(json!({"message": {"valid": true, "age": 17}}));
        })
        .await;

    let config = ValidatorConfig::from_toml_str(&format!(
        "[service]\ndebounce_ms = 10\n\n[api]\nbase_url = \"{}\"\n",
        server.base_url()
    ))?;
    let service = config.build_service(Arc::new(config.build_api()?))?;

    let data: FormData = [
        ("firstName", "Lotte"),
        ("lastName", "Jansen"),
        ("email", "lotte@example.org"),
        ("birthDate", "2008-09-30"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let report = service.validate_step(1, &data).await;

    email_mock.assert_async().await;
    birth_mock.assert_async().await;
    assert!(report.valid);
    assert_eq!(report.summary.warnings, 1);
    assert!(report.results["birthDate"]
        .warning
        .as_deref()
        .unwrap()
        .contains("under 18"));
    Ok(())
}
