//! Thin tracing macros in the style already used by this codebase's
//! generated-parser runtime (`rustemo::debug::{log, logn}`), backed by the
//! `log` crate so a host binary can plug in `env_logger`, `tracing-log`, or
//! anything else without this crate caring.
//!
//! `log!` always ends the message with a newline (maps to `log::trace!`);
//! `logn!` does not, for building up a line across several calls the way
//! the teacher's recognizer tracing does (`logn!("Recognizing <{}> -- ")`
//! followed later by `log!("recognized")`).

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        ::log::trace!($($arg)*)
    };
}

#[macro_export]
macro_rules! logn {
    ($($arg:tt)*) => {
        ::log::trace!($($arg)*)
    };
}

pub use crate::log;
pub use crate::logn;
