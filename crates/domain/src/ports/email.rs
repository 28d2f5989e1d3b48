use crate::ports::BoxFuture;

/// Delivery provider seam. Success is a bare boolean; the callers define no
/// retry contract on top of it.
pub trait EmailSender: Send + Sync {
    fn send_message(&self, to: &str, html_message: &str) -> BoxFuture<'_, bool>;
}
