//! Process-wide tracing setup.

use std::sync::Once;

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::formatter::MoveFormatter;

static SUBSCRIBER_INIT: Once = Once::new();

/// The filter used when `RUST_LOG` is unset.
pub fn default_filter() -> String {
    format!("warn,{}=info", env!("CARGO_CRATE_NAME"))
}

/// Installs the global subscriber. Later calls do nothing.
///
/// `RUST_LOG` overrides [`default_filter`]. If another subscriber was installed first,
/// it is left in place.
pub fn setup_logging() {
    SUBSCRIBER_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));

        let subscriber = tracing_subscriber::fmt()
            .with_ansi(true)
            .event_format(MoveFormatter)
            .with_env_filter(filter)
            .finish()
            .with(ErrorLayer::default());

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::debug!("A global subscriber is already installed");
        }
    });
}
