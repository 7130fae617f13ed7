use std::sync::atomic::{AtomicUsize, Ordering};

/// Sends the user back to the login screen when the session ends.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Navigator that does nothing, for hosts without a login screen.
#[derive(Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to_login(&self) {
        tracing::debug!("session ended, no login screen to redirect to");
    }
}

/// Navigator that counts redirects.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: AtomicUsize,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirect_count(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}
