//! Logging and optional OpenTelemetry export
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default `shipscreen=info`)
//! - `SHIPSCREEN_LOG_FORMAT`: `pretty` (default) or `json`
//! - `SHIPSCREEN_LOG_DIR`: also write JSON logs there, rotated daily
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint, with the `telemetry` feature
//! - `OTEL_SERVICE_NAME`: service name (default: shipscreen)

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. Keep the returned guard alive so buffered
/// file output is flushed on exit.
pub fn init_logging() -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("shipscreen=info"))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let log_format = std::env::var("SHIPSCREEN_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    match log_format.as_str() {
        "json" => layers.push(fmt::layer().json().boxed()),
        _ => layers.push(fmt::layer().pretty().boxed()),
    }

    let guard = match std::env::var("SHIPSCREEN_LOG_DIR") {
        Ok(dir) => {
            let dir = shellexpand::tilde(&dir).into_owned();
            let appender = tracing_appender::rolling::daily(dir, "shipscreen.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            );
            Some(guard)
        }
        Err(_) => None,
    };

    let otel = otel_layer();
    let otel_error = match otel {
        Ok(Some(layer)) => {
            layers.push(layer);
            None
        }
        Ok(None) => None,
        Err(e) => Some(e),
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    if let Some(e) = otel_error {
        tracing::warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)");
    }

    Ok(guard)
}

fn otel_layer() -> Result<Option<BoxedLayer>> {
    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok(None);
    };

    #[cfg(feature = "telemetry")]
    {
        otel_layer_impl(&endpoint).map(Some)
    }

    #[cfg(not(feature = "telemetry"))]
    {
        eprintln!(
            "OTEL_EXPORTER_OTLP_ENDPOINT={} is set but the 'telemetry' feature is not enabled",
            endpoint
        );
        Ok(None)
    }
}

#[cfg(feature = "telemetry")]
fn otel_layer_impl(endpoint: &str) -> Result<BoxedLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "shipscreen".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .build();
    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}
