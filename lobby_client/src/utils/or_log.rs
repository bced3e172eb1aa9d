use std::fmt::{Debug, Display};

/// Log the error side of a result instead of propagating it
pub trait OrLog {
    /// Log at `error` level
    fn or_log(&self, context: impl Display);

    /// Log at `warn` level, for failures that only cost one message
    fn or_warn(&self, context: impl Display);
}

impl<T, E: Debug> OrLog for Result<T, E> {
    fn or_log(&self, context: impl Display) {
        if let Err(e) = &self {
            tracing::error!("Error: {:?} ({})", e, context);
        }
    }

    fn or_warn(&self, context: impl Display) {
        if let Err(e) = &self {
            tracing::warn!("Error: {:?} ({})", e, context);
        }
    }
}
