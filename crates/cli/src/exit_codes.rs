//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                          |
//! |------|------------------------------------------------------------------|
//! | 0    | Success                                                          |
//! | 100  | Arguments or sort specifications could not be processed          |
//! | 200  | Unexpected runtime failure (reading, sorting or writing)         |
//! | 300  | Unexpected checked failure (log file or settings setup)          |
//!
//! POSIX shells see the process status modulo 256, so 300 shows up as 44.

/// Success - the workbook was sorted and written.
pub const EXIT_SUCCESS: i32 = 0;

/// Argument failure - bad flags, malformed sheet sort, or a sort that does
/// not fit the loaded workbook. Usage instructions are printed.
pub const EXIT_ARGS_FAILURE: i32 = 100;

/// Runtime failure - the workbook could not be read, sorted or saved.
pub const EXIT_RUNTIME_FAILURE: i32 = 200;

/// Checked failure - the log file or the settings file could not be set up.
pub const EXIT_CHECKED_FAILURE: i32 = 300;

/// Human-readable name for an exit code (for logs and error output)
pub fn exit_code_name(code: i32) -> &'static str {
    match code {
        EXIT_SUCCESS => "success",
        EXIT_ARGS_FAILURE => "argument failure",
        EXIT_RUNTIME_FAILURE => "runtime failure",
        EXIT_CHECKED_FAILURE => "checked failure",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_ARGS_FAILURE, EXIT_RUNTIME_FAILURE, EXIT_CHECKED_FAILURE];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_exit_code_names() {
        assert_eq!(exit_code_name(100), "argument failure");
        assert_eq!(exit_code_name(300), "checked failure");
        assert_eq!(exit_code_name(7), "unknown");
    }
}
