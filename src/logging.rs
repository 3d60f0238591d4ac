//! Verbosity-gated diagnostic macros for the scheduler.
//!
//! Logging costs nothing at the default level (verbosity=0).
//! Levels:
//! - 0: QUIET (no diagnostics)
//! - 1: DECISIONS (placements, shifts, conflicts)
//! - 2: TRACE (candidate evaluation detail)

/// Verbosity level constants.
pub const VERBOSITY_QUIET: u8 = 0;
pub const VERBOSITY_DECISIONS: u8 = 1;
pub const VERBOSITY_TRACE: u8 = 2;

/// Log at DECISIONS level (verbosity >= 1).
///
/// Used for: task placements, schedule shifts, recorded conflicts.
#[macro_export]
macro_rules! log_decision {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DECISIONS {
            eprintln!($($arg)*);
        }
    };
}

/// Log at TRACE level (verbosity >= 2).
///
/// Used for: resource candidate evaluation, dependency bound computation.
#[macro_export]
macro_rules! log_trace {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_TRACE {
            eprintln!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macros_compile_quiet() {
        let verbosity = VERBOSITY_QUIET;
        log_decision!(verbosity, "placed {}", "a");
        log_trace!(verbosity, "candidate {}", "r1");
    }
}
