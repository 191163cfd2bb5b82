//! ---
//! wtp_section: "00-shared-runtime"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Structured logging context and event helpers."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
//! Logging macros that attach a [`LogContext`](crate::LogContext) to every event.

#[doc(hidden)]
#[macro_export]
macro_rules! __wtp_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            stage = ctx.stage.unwrap_or(""),
            unit = ctx.unit.unwrap_or(""),
            tick = ctx.tick.unwrap_or_default(),
            scenario = ctx.scenario.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with plant context.
#[macro_export]
macro_rules! wtp_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__wtp_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__wtp_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with plant context.
#[macro_export]
macro_rules! wtp_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__wtp_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__wtp_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with plant context.
#[macro_export]
macro_rules! wtp_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__wtp_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__wtp_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with plant context.
#[macro_export]
macro_rules! wtp_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__wtp_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__wtp_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
