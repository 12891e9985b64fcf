use crate::config::LogFormat;
use crate::{Result, ServerError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

const DEFAULT_FILTER: &str = "mobsync_server=debug,mobsync_core=info,tower_http=debug,warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true);

    match format {
        LogFormat::Pretty => layer.with_ansi(true).boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

#[cfg(feature = "jaeger")]
fn telemetry_enabled() -> bool {
    std::env::var("ENABLE_TELEMETRY")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false)
}

/// Install the global tracing subscriber
#[cfg(not(feature = "jaeger"))]
pub fn init_telemetry(format: LogFormat) -> Result<()> {
    Registry::default()
        .with(env_filter())
        .with(fmt_layer(format))
        .try_init()
        .map_err(|e| ServerError::Telemetry(e.to_string()))
}

/// Install the global tracing subscriber, exporting spans to Jaeger when
/// `ENABLE_TELEMETRY=true`
#[cfg(feature = "jaeger")]
pub fn init_telemetry(format: LogFormat) -> Result<()> {
    use opentelemetry::sdk::propagation::TraceContextPropagator;
    use opentelemetry::sdk::{
        trace::{self, RandomIdGenerator, Sampler},
        Resource,
    };
    use opentelemetry::{global, KeyValue};

    if !telemetry_enabled() {
        return Registry::default()
            .with(env_filter())
            .with(fmt_layer(format))
            .try_init()
            .map_err(|e| ServerError::Telemetry(e.to_string()));
    }

    global::set_text_map_propagator(TraceContextPropagator::new());

    let jaeger_endpoint = std::env::var("JAEGER_ENDPOINT")
        .unwrap_or_else(|_| "http://jaeger:14268/api/traces".to_string());

    let tracer = opentelemetry_jaeger::new_collector_pipeline()
        .with_service_name("mobsync-server")
        .with_endpoint(&jaeger_endpoint)
        .with_isahc()
        .with_trace_config(
            trace::config()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(Resource::new(vec![
                    KeyValue::new("service.name", "mobsync-server"),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ])),
        )
        .with_timeout(std::time::Duration::from_secs(2))
        .install_batch(opentelemetry::runtime::Tokio)
        .map_err(|e| ServerError::Telemetry(e.to_string()))?;

    Registry::default()
        .with(env_filter())
        .with(fmt_layer(format))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .map_err(|e| ServerError::Telemetry(e.to_string()))?;

    tracing::info!(%jaeger_endpoint, "Telemetry initialized");
    Ok(())
}

/// Flush pending spans
pub fn shutdown_telemetry() {
    #[cfg(feature = "jaeger")]
    if telemetry_enabled() {
        opentelemetry::global::shutdown_tracer_provider();
    }
}
