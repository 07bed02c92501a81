// Exit codes for direct-commit.
//
//   0 = every file committed
//   1 = any failure (missing token, unreadable file, rejected write)
//
// Argument errors are reported by clap with its own code (2).

use std::process;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_result<T>(result: &anyhow::Result<T>) -> Self {
        if result.is_ok() {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
