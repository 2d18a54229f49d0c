use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "quire_components_registered_total",
            Unit::Count,
            "Total number of components added to the registry."
        );
        describe_counter!(
            "quire_components_removed_total",
            Unit::Count,
            "Total number of components dropped from the registry."
        );
        describe_counter!(
            "quire_component_updates_total",
            Unit::Count,
            "Total number of successful property updates, labelled by component kind."
        );
        describe_counter!(
            "quire_component_update_failures_total",
            Unit::Count,
            "Total number of rejected property updates."
        );
        describe_counter!(
            "quire_content_syncs_total",
            Unit::Count,
            "Total number of times the editable markup was pushed to the content sink."
        );
        describe_gauge!(
            "quire_components_tracked",
            Unit::Count,
            "Current number of components in the registry."
        );
        describe_histogram!(
            "quire_mutation_batch_size",
            Unit::Count,
            "Number of mutation records drained per flush."
        );
    });
}
