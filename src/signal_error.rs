use thiserror::Error;

/// Failures raised by the dispatcher itself rather than by a receiver.
///
/// Receiver failures travel as the `anyhow::Error` the receiver returned.
/// The variants here describe conditions the dispatcher detects on its own.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    /// A receiver panicked during `send_robust`. The panic was caught and the
    /// broadcast continued with the next receiver.
    ///
    /// `location` is the `file:line:column` of the panic inside the receiver.
    /// It is `None` when another panic hook replaced the one this crate
    /// chains in on the first robust send. A backtrace captured by the
    /// resulting `anyhow::Error` points at the dispatcher, not at the
    /// receiver, so `location` is the way back to the failing code.
    #[error("Receiver panicked: {message}")]
    ReceiverPanicked {
        message: String,
        location: Option<String>,
    },
}

impl SignalError {
    /// Builds a `ReceiverPanicked` from a payload caught by `catch_unwind`.
    pub(crate) fn from_panic(
        payload: Box<dyn std::any::Any + Send>,
        location: Option<String>,
    ) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<unknown panic>".to_string()
        };
        SignalError::ReceiverPanicked { message, location }
    }
}
