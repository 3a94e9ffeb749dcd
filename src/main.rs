use anyhow::Context;
use clap::Parser;
use membership_validation::adapters::form_file::load_form_data;
use membership_validation::adapters::terminal::TerminalElement;
use membership_validation::utils::error::ErrorSeverity;
use membership_validation::utils::{logger, validation::Validate};
use membership_validation::{
    BatchReport, CliArgs, FieldEvent, ValidationService, ValidatorConfig, ValidatorError,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => match ValidatorConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => ValidatorConfig::default(),
    };

    // 初始化日誌
    let verbose = args.verbose || config.verbose_logging();
    if config.json_logging() {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("🚀 Starting membership-validate");

    // 驗證配置
    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    let api = match config.build_api() {
        Ok(api) => api,
        Err(e) => exit_with(&e),
    };
    let service = config
        .build_service(Arc::new(api))
        .context("building validation service")?;

    if let Some(field) = &args.watch {
        return watch_field(&service, field).await;
    }

    let data_path = args
        .data
        .as_deref()
        .context("--data is required unless --watch is given")?;
    let data = match load_form_data(data_path) {
        Ok(data) => data,
        Err(e) => exit_with(&e),
    };

    let report = match (args.step, args.fields.is_empty()) {
        (Some(step), _) => service.validate_step(step, &data).await,
        (None, false) => service.validate_fields(&data, Some(args.fields.as_slice())).await,
        (None, true) => service.validate_fields(&data, None).await,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    let stats = service.get_validation_stats();
    tracing::debug!(
        "📊 cache: {} entries, {} hits / {} misses, {} remote calls, {} network failures",
        stats.cache_size,
        stats.cache_hits,
        stats.cache_misses,
        stats.remote_calls,
        stats.network_failures
    );

    if !report.valid {
        std::process::exit(2);
    }
    Ok(())
}

/// Each stdin line is one input event; end of input blurs the field.
async fn watch_field(service: &ValidationService, field: &str) -> anyhow::Result<()> {
    if service.get_rule(field).is_none() {
        tracing::warn!("No rule registered for '{}', every value is accepted", field);
    }

    let context = service.context_for(&Default::default());
    let binding = service.setup_real_time_validation(Arc::new(TerminalElement), field, context);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_value = String::new();
    let mut tasks = Vec::new();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        tasks.extend(binding.handle(FieldEvent::Input, &line));
        last_value = line;
    }
    tasks.extend(binding.handle(FieldEvent::Blur, &last_value));

    // 被取代的任務會立即結束，逐一等待即可發現 panic
    for task in tasks {
        task.await.context("validation task panicked")?;
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    let summary = &report.summary;
    if report.valid {
        println!("✅ All {} fields are valid", summary.total);
    } else {
        println!(
            "❌ {} of {} fields failed validation",
            summary.failed + summary.superseded.len(),
            summary.total
        );
    }

    for error in &report.errors {
        println!("   • {}: {}", error.field, error.message);
    }

    let mut warnings: Vec<_> = report
        .results
        .iter()
        .filter_map(|(field, result)| result.warning.as_ref().map(|w| (field, w)))
        .collect();
    warnings.sort();
    for (field, warning) in warnings {
        println!("   ⚠️ {}: {}", field, warning);
    }

    for field in &summary.superseded {
        println!("   ⏳ {}: validation did not finish", field);
    }
}

fn exit_with(e: &ValidatorError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
