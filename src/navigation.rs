//! Navigation seam between the handshake and whatever hosts it

use crate::types::Destination;

/// Performs the navigations the handshake asks for.
///
/// `redirect` hands control to an external page (the gateway). Nothing in
/// the calling component runs after it; the flow resumes in a fresh
/// [`ReturnHandler`](crate::ReturnHandler) once the gateway redirects back.
pub trait Navigator: Send + Sync {
    /// Full navigation to an external URL.
    fn redirect(&self, url: &str);

    /// Navigate to an in-app view.
    fn navigate(&self, destination: Destination);
}

/// Navigator that only logs, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, url: &str) {
        tracing::info!("Redirecting to {}", url);
    }

    fn navigate(&self, destination: Destination) {
        tracing::info!("Navigating to {}", destination.path());
    }
}
