//! Cross-platform logging module.
//!
//! The `log_*!` macros format once and hand the line to the platform backend:
//! - Web: `web_sys::console`
//! - Native: the `tracing` crate, under the `opsdash_client` target

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
}

#[cfg(target_arch = "wasm32")]
pub fn emit(level: Level, msg: &str) {
    let line = wasm_bindgen::JsValue::from_str(msg);
    match level {
        Level::Debug => web_sys::console::debug_1(&line),
        Level::Info => web_sys::console::log_1(&line),
        Level::Warn => web_sys::console::warn_1(&line),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn emit(level: Level, msg: &str) {
    match level {
        Level::Debug => tracing::debug!(target: "opsdash_client", "{}", msg),
        Level::Info => tracing::info!(target: "opsdash_client", "{}", msg),
        Level::Warn => tracing::warn!(target: "opsdash_client", "{}", msg),
    }
}

/// Log an info message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Info, &format!($($arg)*))
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Warn, &format!($($arg)*))
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Debug, &format!($($arg)*))
    };
}
