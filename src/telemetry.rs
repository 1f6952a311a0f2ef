use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the JSON subscriber. `debug` lowers the default filter so the
/// calculator's assignment trace is visible without setting `RUST_LOG`.
pub fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "info,power_flow_solver=debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();
}
