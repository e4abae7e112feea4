use log::warn;

#[cfg(test)]
use mockall::automock;

/// Fire-and-forget desktop alert surface. Implementations must not block
/// for long and must swallow their own failures.
#[cfg_attr(test, automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Sends real desktop notifications through the platform notification
/// service. Failures are logged and dropped; an undelivered toast is not
/// worth crashing over.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        let result = notify_rust::Notification::new()
            .appname("caltray")
            .summary(title)
            .body(body)
            .show();
        if let Err(e) = result {
            warn!("Failed to show notification '{}': {}", title, e);
        }
    }
}
