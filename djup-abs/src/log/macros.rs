//! Macros for generating log messages.
//!
//! The per-level macros are thin wrappers around one shared emitter, `log_event!`, which tags
//! the event with its threshold; `critical!` is an error-level message with a `[CRITICAL]`
//! prefix baked into the format arguments.

/// The shared emitter behind the level macros. Not meant to be invoked directly.
#[doc(hidden)]
#[macro_export]
macro_rules! log_event {
    ($level:expr, $threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $level,
                threshold = $threshold as u64,
                message = format_args!($($arg)+)
            );
        }
    };
}

#[macro_export]
macro_rules! critical {
    ($threshold:expr, $($arg:tt)+) => {
        $crate::log_event!(
            $crate::tracing::Level::ERROR,
            $threshold,
            "[CRITICAL] {}",
            format_args!($($arg)+)
        )
    };
    ($($arg:tt)+) => {
        $crate::log_event!(
            $crate::tracing::Level::ERROR,
            0,
            "[CRITICAL] {}",
            format_args!($($arg)+)
        )
    };
}

#[macro_export]
macro_rules! error {
    ($threshold:expr, $($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::ERROR, $threshold, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::ERROR, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($threshold:expr, $($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::WARN, $threshold, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::WARN, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($threshold:expr, $($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::INFO, $threshold, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::INFO, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($threshold:expr, $($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::DEBUG, $threshold, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::DEBUG, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! trace {
    ($threshold:expr, $($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::TRACE, $threshold, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log_event!($crate::tracing::Level::TRACE, 0, $($arg)+)
    };
}

// The following makes the macros importable directly from the `log` module.
pub use {critical, debug, error, info, log_event, trace, warning};
