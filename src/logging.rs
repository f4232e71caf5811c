use std::sync::Once;

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::formatter::CustomFormatter;

static SUBSCRIBER_INIT: Once = Once::new();

/// Installs the global tracing subscriber. Later calls do nothing.
///
/// `RUST_LOG` overrides the default of `warn` everywhere and `info` for this crate.
pub fn setup_logging() {
    SUBSCRIBER_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("warn,{}=info", env!("CARGO_CRATE_NAME"))));

        let installed = tracing_subscriber::registry()
            .with(fmt::layer().event_format(CustomFormatter))
            .with(filter)
            .with(ErrorLayer::default())
            .try_init();

        if let Err(error) = installed {
            eprintln!("Logging already configured elsewhere: {error}");
        }
    });
}
