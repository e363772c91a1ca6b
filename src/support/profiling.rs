//! Frame and scope instrumentation.
//!
//! Scopes are `tracing` spans. With the `profiling-tracy` feature they are
//! forwarded to a Tracy client and every presented frame is marked.

/// Installs the Tracy layer as the global subscriber.
///
/// Returns `false` when profiling is compiled out or a subscriber is already set.
#[cfg(feature = "profiling-tracy")]
pub fn init_profiling() -> bool {
    use tracing_subscriber::layer::SubscriberExt;

    let subscriber = tracing_subscriber::registry().with(tracing_tracy::TracyLayer::default());
    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => {
            log::info!("Tracy profiling enabled");
            true
        }
        Err(error) => {
            log::warn!("Tracy profiling unavailable: {}", error);
            false
        }
    }
}

#[cfg(not(feature = "profiling-tracy"))]
pub fn init_profiling() -> bool {
    false
}

/// Marks the end of a presented frame.
pub fn mark_frame() {
    #[cfg(feature = "profiling-tracy")]
    {
        if let Some(client) = tracing_tracy::client::Client::running() {
            client.frame_mark();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_profiling_only_once() {
        let _ = init_profiling();
        assert!(!init_profiling());
        mark_frame();
    }
}
