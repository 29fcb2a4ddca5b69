use std::env;

use lazy_static::lazy_static;

lazy_static! {
    static ref ENVIRONMENT: DebugConfig = DebugConfig::from_env();
}

/// Switches for the diagnostic listings written to stderr.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct DebugConfig {
    /// Disassemble every successfully compiled chunk.
    pub print_code: bool,
    /// Dump the stack and the next instruction before each dispatch.
    pub trace_execution: bool,
}

impl DebugConfig {
    /// Reads `DEBUG_PRINT_CODE` and `DEBUG_TRACE_EXECUTION`; a value of `1` enables the switch.
    pub fn from_env() -> Self {
        Self {
            print_code: env::var("DEBUG_PRINT_CODE") == Ok("1".to_string()),
            trace_execution: env::var("DEBUG_TRACE_EXECUTION") == Ok("1".to_string()),
        }
    }

    /// The environment's switches, read once per process.
    pub fn environment() -> Self {
        *ENVIRONMENT
    }

    /// Turns code printing on when `enabled`, keeping it on if it already was.
    pub fn with_print_code(mut self, enabled: bool) -> Self {
        self.print_code |= enabled;
        self
    }

    /// Turns execution tracing on when `enabled`, keeping it on if it already was.
    pub fn with_trace_execution(mut self, enabled: bool) -> Self {
        self.trace_execution |= enabled;
        self
    }
}
