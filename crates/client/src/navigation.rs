//! Navigation collaborator invoked on forced logout.
//!
//! The client does not route anything itself. When the gateway tears the
//! session down after a 401, it hands the login entry point to whatever
//! [`Navigator`] the embedding application supplied.

/// Login entry point passed to [`Navigator::navigate`] on forced logout.
pub const LOGIN_ROUTE: &str = "/login";

/// Something that can move the user to another screen or route.
pub trait Navigator: Send + Sync {
    /// Navigate to `target`.
    fn navigate(&self, target: &str);
}

/// Navigator that only logs the redirect.
///
/// Suitable for headless consumers (the CLI) where "navigate to login" means
/// telling the user to log in again.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, target: &str) {
        tracing::info!(target_route = %target, "Navigation requested");
    }
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, target: &str) {
        self(target);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_closure_navigator() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let navigator = move |target: &str| {
            assert_eq!(target, LOGIN_ROUTE);
            counter.fetch_add(1, Ordering::SeqCst);
        };

        navigator.navigate(LOGIN_ROUTE);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tracing_navigator_is_object_safe() {
        let navigator: Arc<dyn Navigator> = Arc::new(TracingNavigator);
        navigator.navigate(LOGIN_ROUTE);
    }
}
