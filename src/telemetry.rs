use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Initialize structured logging. Every façade action logs a transition
/// event with entity ids, statuses, and the correlation id of the request
/// that triggered it.
pub fn init_telemetry() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("bookforge telemetry initialized with structured logging");
    Ok(())
}

/// Generate a correlation ID for linking a transition to the jobs it
/// enqueues.
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span with common orchestration attributes.
pub fn create_transition_span(
    machine: &str,
    entity_id: &str,
    action: &str,
    correlation_id: Option<&str>,
) -> tracing::Span {
    tracing::info_span!(
        "state_transition",
        machine = machine,
        entity.id = entity_id,
        action = action,
        correlation.id = correlation_id,
    )
}
