//! Where failed backend calls are shown to the user.

use std::sync::Mutex;

/// A notification surface for backend failures.
///
/// Pages render the collected messages into the shared error modal; HTMX
/// actions answer with an error-modal fragment instead.
pub trait ErrorSurface: Send + Sync {
    /// Show one error message.
    fn show_error(&self, message: &str);
}

/// Request-scoped error surface collecting messages in display order.
#[derive(Debug, Default)]
pub struct Notices {
    messages: Mutex<Vec<String>>,
}

impl Notices {
    /// Messages shown so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Remove and return the messages shown so far.
    #[must_use]
    pub fn take(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|mut messages| std::mem::take(&mut *messages))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages
            .lock()
            .map(|messages| messages.is_empty())
            .unwrap_or(true)
    }
}

impl ErrorSurface for Notices {
    fn show_error(&self, message: &str) {
        tracing::debug!(message, "Showing error to user");
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
