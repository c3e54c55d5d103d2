//! Exit code constants for the moot binary.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments |
//! | 3 | `CONFIG` | Invalid or incomplete configuration |
//! | 9 | `LOCK_HELD` | Another process holds the state directory lock |
//! | 70 | `GENERATION_FAILURE` | A generation call failed for good |
//! | 74 | `STORE_FAILURE` | The case store could not be read or written |
//! | 75 | `POOL_EXHAUSTED` | No usable model/key pair remains |

/// Exit codes matching the table above.
///
/// ```rust
/// use moot_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::POOL_EXHAUSTED, ExitCode::from_i32(75));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid or missing command-line arguments
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Configuration error - invalid file, value, or missing credentials
    pub const CONFIG: ExitCode = ExitCode(3);

    /// Lock held - another process is writing to the same state directory
    pub const LOCK_HELD: ExitCode = ExitCode(9);

    /// Generation failure - a case or verdict could not be generated
    pub const GENERATION_FAILURE: ExitCode = ExitCode(70);

    /// Store failure - the persistence layer failed
    pub const STORE_FAILURE: ExitCode = ExitCode(74);

    /// Pool exhausted - every model ran out of usable keys
    pub const POOL_EXHAUSTED: ExitCode = ExitCode(75);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}
