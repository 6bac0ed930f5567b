//! Desktop notifications for leak verdicts and remediations

use notify_rust::Notification;
use tracing::warn;

pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn send(&self, summary: &str, body: &str) {
        if !self.enabled {
            return;
        }
        if let Err(e) = Notification::new()
            .summary(summary)
            .body(body)
            .appname("LeakWatch")
            .show()
        {
            warn!("Failed to send notification: {}", e);
        }
    }
}
