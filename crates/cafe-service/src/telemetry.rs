//! Tracing setup for binaries and adapters embedding the services.

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber filtered by `filter`
/// (e.g. `"info"` or `"cafe_service=debug,sqlx=warn"`).
///
/// An unparsable filter falls back to `info`. Fails if a global subscriber
/// is already set.
pub fn init_tracing(filter: &str) -> Result<(), TryInitError> {
    let (env_filter, rejected) = match EnvFilter::try_new(filter) {
        Ok(f) => (f, None),
        Err(e) => (EnvFilter::new("info"), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .finish()
        .try_init()?;

    if let Some(err) = rejected {
        tracing::warn!(filter, error = %err, "Invalid log filter, using info");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // Whichever call installs the global subscriber, the next one is refused.
        let _ = init_tracing("not a [valid filter");
        assert!(init_tracing("info").is_err());
    }
}
