//! Logging and OpenTelemetry initialization
//!
//! Console output is human-readable or JSON; an optional rolling log file mirrors it.
//! `RUST_LOG` overrides the configured level. When enabled, spans are exported over
//! OTLP so request traces can be followed across services.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{Sampler, TracerProvider},
    Resource,
};
use std::{fs, time::Duration};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const TRACER_NAME: &str = "question-service";

/// Keeps the file writer flushing and shuts OpenTelemetry down on drop.
/// Hold it for the lifetime of the process.
pub struct TelemetryGuard {
    _file_guard: Option<WorkerGuard>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        shutdown_telemetry();
    }
}

/// Install the global tracing subscriber described by `config`.
///
/// A failing OTLP exporter does not stop startup; the service logs a warning and
/// runs with console and file output only.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<TelemetryGuard> {
    let otel = config
        .opentelemetry_enabled
        .then(|| tracer_provider(config));

    let registry = tracing_subscriber::registry().with(build_env_filter(config));
    let file_guard = match &otel {
        Some(Ok(provider)) => {
            let otel_layer = tracing_opentelemetry::layer()
                .with_tracer(provider.tracer(TRACER_NAME))
                .with_tracked_inactivity(true);
            init_output_layers(registry.with(otel_layer), config)?
        }
        _ => init_output_layers(registry, config)?,
    };

    match otel {
        Some(Ok(provider)) => {
            global::set_tracer_provider(provider);
        }
        Some(Err(e)) => tracing::warn!(
            error = %e,
            endpoint = %config.otlp_endpoint,
            "OpenTelemetry export disabled: tracer provider failed to start"
        ),
        None => {}
    }

    tracing::info!(
        level = %config.level,
        json = config.json,
        file = config.file_enabled,
        otel_enabled = config.opentelemetry_enabled,
        service_name = %config.service_name,
        environment = %config.deployment_environment,
        "Logging initialized"
    );

    Ok(TelemetryGuard {
        _file_guard: file_guard,
    })
}

fn tracer_provider(config: &LoggingConfig) -> anyhow::Result<TracerProvider> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(&config.otlp_endpoint)
        .with_timeout(Duration::from_secs(config.otlp_timeout_seconds))
        .build_span_exporter()
        .map_err(|e| anyhow::anyhow!("Failed to create OTLP exporter: {}", e))?;

    let trace_config = opentelemetry_sdk::trace::Config::default()
        .with_sampler(sampler(config.trace_sample_ratio))
        .with_resource(resource(config));

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_config(trace_config)
        .build())
}

fn resource(config: &LoggingConfig) -> Resource {
    let version = config
        .service_version
        .as_deref()
        .unwrap_or(env!("CARGO_PKG_VERSION"))
        .to_string();

    Resource::new([
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", version),
        KeyValue::new(
            "deployment.environment",
            config.deployment_environment.clone(),
        ),
    ])
}

/// Ratio sampling that follows the caller's decision when a parent span exists.
fn sampler(ratio: f64) -> Sampler {
    match ratio {
        r if r >= 1.0 => Sampler::AlwaysOn,
        r if r <= 0.0 => Sampler::AlwaysOff,
        r => Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(r))),
    }
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // sqlx logs every statement at info
        EnvFilter::new(format!(
            "question_service={level},question_server={level},tower_http=info,sqlx=warn",
            level = config.level
        ))
    })
}

fn init_output_layers<S>(subscriber: S, config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>>
where
    S: SubscriberExt + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    let file = if config.file_enabled {
        Some(create_file_appender(config)?)
    } else {
        None
    };
    let (file_writer, file_guard) = match file {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };

    if config.json {
        let console_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stdout);
        let file_layer = file_writer.map(|writer| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(writer)
        });
        subscriber.with(console_layer).with(file_layer).init();
    } else {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stdout);
        let file_layer = file_writer.map(|writer| {
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer)
        });
        subscriber.with(console_layer).with(file_layer).init();
    }

    Ok(file_guard)
}

fn create_file_appender(config: &LoggingConfig) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.file_directory)?;

    let directory = &config.file_directory;
    let prefix = &config.file_prefix;
    let appender = match config.file_rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(directory, prefix),
        "minutely" => tracing_appender::rolling::minutely(directory, prefix),
        "never" => tracing_appender::rolling::never(directory, format!("{prefix}.log")),
        _ => tracing_appender::rolling::daily(directory, prefix),
    };

    Ok(tracing_appender::non_blocking(appender))
}

/// Flush and shut down the OpenTelemetry pipeline.
fn shutdown_telemetry() {
    global::shutdown_tracer_provider();
}
