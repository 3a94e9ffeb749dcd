use crate::core::basic::check_basic;
use crate::core::binder::{FieldBinding, FieldElement};
use crate::core::cache::TtlCache;
use crate::core::debounce::{Debouncer, Ticket};
use crate::core::rules::{RemoteCheck, RuleRegistry, StepMap, ValidationRule};
use crate::domain::model::{
    BatchReport, BatchSummary, FieldError, FormData, ValidationContext, ValidationResult,
    ValidationStats,
};
use crate::domain::ports::ValidationApi;
use crate::utils::error::{Result, ValidatorError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_COUNTRY: &str = "NL";

const MINOR_AGE: u64 = 18;
const IMPLAUSIBLE_AGE: u64 = 100;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub debounce: Duration,
    pub cache_ttl: Duration,
    /// `None` leaves remote calls unbounded.
    pub request_timeout: Option<Duration>,
    pub default_country: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            default_country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

#[derive(Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    remote_calls: AtomicU64,
    network_failures: AtomicU64,
}

struct Inner {
    api: Arc<dyn ValidationApi>,
    registry: RuleRegistry,
    steps: StepMap,
    settings: ServiceSettings,
    cache: TtlCache<ValidationResult>,
    debouncer: Debouncer,
    counters: Counters,
}

/// Outcome of the synchronous part of a field check.
pub(crate) enum FieldCheck {
    Done(ValidationResult),
    Scheduled(Ticket),
}

/// Validation service for the membership application wizard. Cloning is
/// cheap and every clone shares the same cache, timers and counters.
#[derive(Clone)]
pub struct ValidationService {
    inner: Arc<Inner>,
}

impl ValidationService {
    pub fn new(
        api: Arc<dyn ValidationApi>,
        registry: RuleRegistry,
        steps: StepMap,
        settings: ServiceSettings,
    ) -> Self {
        tracing::debug!(
            "Validation service ready: {} rules, debounce {:?}, cache TTL {:?}",
            registry.len(),
            settings.debounce,
            settings.cache_ttl
        );

        Self {
            inner: Arc::new(Inner {
                api,
                cache: TtlCache::new(settings.cache_ttl),
                debouncer: Debouncer::new(settings.debounce),
                registry,
                steps,
                settings,
                counters: Counters::default(),
            }),
        }
    }

    /// 預設的會員申請規則與步驟
    pub fn with_defaults(api: Arc<dyn ValidationApi>) -> Result<Self> {
        Ok(Self::new(
            api,
            RuleRegistry::membership_defaults()?,
            StepMap::membership_defaults(),
            ServiceSettings::default(),
        ))
    }

    pub fn get_rule(&self, field_name: &str) -> Option<&ValidationRule> {
        self.inner.registry.get_rule(field_name)
    }

    pub fn context_for(&self, data: &FormData) -> ValidationContext {
        ValidationContext::from_form(data, &self.inner.settings.default_country)
    }

    /// Basic checks first; async-eligible fields then go through the
    /// debounced remote check. `None` means a newer request for the same
    /// field overtook this one and there is nothing to render.
    pub async fn validate_field(
        &self,
        field_name: &str,
        value: &str,
        context: &ValidationContext,
    ) -> Option<ValidationResult> {
        match self.begin_field(field_name, value) {
            FieldCheck::Done(result) => Some(result),
            FieldCheck::Scheduled(ticket) => self.finish_field(field_name, value, context, ticket).await,
        }
    }

    /// Synchronous half of `validate_field`: either the answer is known right
    /// away or the field's debounce cycle is registered before returning.
    pub(crate) fn begin_field(&self, field_name: &str, value: &str) -> FieldCheck {
        let Some(rule) = self.inner.registry.get_rule(field_name) else {
            return FieldCheck::Done(ValidationResult::ok());
        };

        let basic = check_basic(field_name, value, rule);
        if !basic.valid || !rule.is_async || value.trim().is_empty() {
            // An older remote answer must not overwrite this one.
            self.inner.debouncer.cancel(field_name);
            return FieldCheck::Done(basic);
        }

        self.begin_async(field_name, value)
    }

    pub(crate) async fn finish_field(
        &self,
        field_name: &str,
        value: &str,
        context: &ValidationContext,
        ticket: Ticket,
    ) -> Option<ValidationResult> {
        match self.inner.registry.get_rule(field_name) {
            Some(rule) => self.run_remote(field_name, value, rule, context, ticket).await,
            None => Some(ValidationResult::ok()),
        }
    }

    pub async fn check_async(
        &self,
        field_name: &str,
        value: &str,
        rule: &ValidationRule,
        context: &ValidationContext,
    ) -> Option<ValidationResult> {
        match self.begin_async(field_name, value) {
            FieldCheck::Done(result) => Some(result),
            FieldCheck::Scheduled(ticket) => {
                self.run_remote(field_name, value, rule, context, ticket).await
            }
        }
    }

    fn begin_async(&self, field_name: &str, value: &str) -> FieldCheck {
        let inner = &self.inner;
        let key = TtlCache::<ValidationResult>::key(field_name, value);

        if let Some(cached) = inner.cache.get(&key) {
            inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            inner.debouncer.cancel(field_name);
            tracing::debug!("🗂️ {}: cache hit", field_name);
            return FieldCheck::Done(cached);
        }
        inner.counters.cache_misses.fetch_add(1, Ordering::Relaxed);

        FieldCheck::Scheduled(inner.debouncer.schedule(field_name))
    }

    async fn run_remote(
        &self,
        field_name: &str,
        value: &str,
        rule: &ValidationRule,
        context: &ValidationContext,
        mut ticket: Ticket,
    ) -> Option<ValidationResult> {
        let inner = &self.inner;
        if !inner.debouncer.wait(&mut ticket).await {
            tracing::debug!("⏱️ {}: request #{} superseded before firing", field_name, ticket.id());
            return None;
        }

        let outcome = match inner.settings.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.dispatch(field_name, value, rule, context))
                .await
                .unwrap_or_else(|_| {
                    Err(ValidatorError::TimeoutError {
                        field: field_name.to_string(),
                        after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })
                }),
            None => self.dispatch(field_name, value, rule, context).await,
        };

        let result = match outcome {
            Ok(result) => {
                let result = annotate(rule, result);
                let key = TtlCache::<ValidationResult>::key(field_name, value);
                inner.cache.insert(key, result.clone());
                result
            }
            Err(e) => {
                inner.counters.network_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("⚠️ {}: validation unavailable: {}", field_name, e);
                ValidationResult::network_failure()
            }
        };

        if !inner.debouncer.complete(&ticket) {
            tracing::debug!(
                "⏱️ {}: discarding response for request #{}, a newer one exists",
                field_name,
                ticket.id()
            );
            return None;
        }

        Some(result)
    }

    async fn dispatch(
        &self,
        field_name: &str,
        value: &str,
        rule: &ValidationRule,
        context: &ValidationContext,
    ) -> Result<ValidationResult> {
        if let Some(custom) = &rule.custom_validator {
            return custom.validate(value, context).await;
        }

        let Some(remote) = rule.remote else {
            return Ok(ValidationResult::ok());
        };

        let api = &self.inner.api;
        let country = context.country_or(&self.inner.settings.default_country);
        self.inner.counters.remote_calls.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("📡 {}: calling {:?} check", field_name, remote);

        match remote {
            RemoteCheck::Email => api.validate_email(value).await,
            RemoteCheck::PostalCode => api.validate_postal_code(value, country).await,
            RemoteCheck::PhoneNumber => api.validate_phone_number(value, country).await,
            RemoteCheck::BirthDate => api.validate_birth_date(value).await,
        }
    }

    /// Validates `field_names` (every registered field when `None`)
    /// concurrently. Missing values count as empty, repeated names are
    /// validated once.
    pub async fn validate_fields(&self, data: &FormData, field_names: Option<&[String]>) -> BatchReport {
        let mut fields: Vec<String> = match field_names {
            Some(names) => names.to_vec(),
            None => self.inner.registry.field_names(),
        };
        let mut seen = HashSet::new();
        fields.retain(|field| seen.insert(field.clone()));
        let context = self.context_for(data);

        let mut tasks = JoinSet::new();
        for field in &fields {
            let service = self.clone();
            let field = field.clone();
            let value = data.get(&field).cloned().unwrap_or_default();
            let context = context.clone();
            tasks.spawn(async move {
                let result = service.validate_field(&field, &value, &context).await;
                (field, result)
            });
        }

        let mut outcomes: HashMap<String, Option<ValidationResult>> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((field, result)) => {
                    outcomes.insert(field, result);
                }
                Err(e) => tracing::error!("❌ Field validation task failed: {}", e),
            }
        }

        let mut report = BatchReport {
            valid: true,
            summary: BatchSummary {
                total: fields.len(),
                ..BatchSummary::default()
            },
            ..BatchReport::default()
        };

        for field in fields {
            let result = match outcomes.remove(&field) {
                Some(Some(result)) => result,
                Some(None) => {
                    report.valid = false;
                    report.summary.superseded.push(field);
                    continue;
                }
                None => {
                    // 任務異常結束，沒有結果可回報
                    report.valid = false;
                    report.summary.failed += 1;
                    report.errors.push(FieldError {
                        message: format!("{} could not be validated", field),
                        field,
                        kind: None,
                    });
                    continue;
                }
            };

            if result.valid {
                report.summary.passed += 1;
                if result.warning.is_some() {
                    report.summary.warnings += 1;
                }
            } else {
                report.valid = false;
                report.summary.failed += 1;
                report.errors.push(FieldError {
                    field: field.clone(),
                    message: result
                        .message
                        .clone()
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                    kind: result.kind,
                });
            }
            report.results.insert(field, result);
        }

        tracing::info!(
            "✅ Validated {} fields: {} passed, {} failed",
            report.summary.total,
            report.summary.passed,
            report.summary.failed
        );
        report
    }

    pub async fn validate_step(&self, step: u32, data: &FormData) -> BatchReport {
        match self.inner.steps.fields_for(step) {
            Some(fields) => {
                tracing::debug!("Validating step {} ({} fields)", step, fields.len());
                self.validate_fields(data, Some(fields)).await
            }
            None => {
                tracing::warn!("Step {} has no fields mapped, nothing to validate", step);
                let no_fields: &[String] = &[];
                self.validate_fields(data, Some(no_fields)).await
            }
        }
    }

    pub fn setup_real_time_validation(
        &self,
        element: Arc<dyn FieldElement>,
        field_name: &str,
        context: ValidationContext,
    ) -> FieldBinding {
        FieldBinding::new(self.clone(), element, field_name, context)
    }

    /// Drops cached results whose `field:value` key contains `pattern`, or
    /// the whole cache.
    pub fn clear_cache(&self, pattern: Option<&str>) -> usize {
        let removed = self.inner.cache.clear(pattern);
        tracing::debug!("🗑️ Cleared {} cached results", removed);
        removed
    }

    pub fn get_validation_stats(&self) -> ValidationStats {
        let counters = &self.inner.counters;
        ValidationStats {
            cache_size: self.inner.cache.len(),
            pending_timers: self.inner.debouncer.pending(),
            registered_rules: self.inner.registry.len(),
            cache_hits: counters.cache_hits.load(Ordering::Relaxed),
            cache_misses: counters.cache_misses.load(Ordering::Relaxed),
            remote_calls: counters.remote_calls.load(Ordering::Relaxed),
            network_failures: counters.network_failures.load(Ordering::Relaxed),
        }
    }
}

/// Age notices for birth-date answers that did not bring their own warning.
fn annotate(rule: &ValidationRule, result: ValidationResult) -> ValidationResult {
    if rule.remote != Some(RemoteCheck::BirthDate) || !result.valid || result.warning.is_some() {
        return result;
    }

    match result.age() {
        Some(age) if age < MINOR_AGE => {
            result.with_warning("Applicants under 18 need consent from a parent or guardian")
        }
        Some(age) if age > IMPLAUSIBLE_AGE => {
            result.with_warning("Please double-check the birth date")
        }
        _ => result,
    }
}
