//! Outcome evaluation
//!
//! Combines whether a run succeeded with the negative-test flag:
//!
//! | run succeeded | negative | verdict |
//! |---|---|---|
//! | yes | no  | pass |
//! | yes | yes | fail, the path was unexpectedly reachable |
//! | no  | no  | fail |
//! | no  | yes | pass, failed as expected |

use crate::types::Protocol;
use serde::Serialize;

/// Final pass/fail decision of a client run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    pub message: String,
}

impl Verdict {
    /// Evaluate a run of `protocol`
    pub fn evaluate(protocol: Protocol, run_succeeded: bool, negative: bool) -> Self {
        let label = protocol.label();
        let (passed, message) = match (run_succeeded, negative) {
            (true, false) => (true, format!("{} test passed", label)),
            (true, true) => (false, format!("Negative {} test failed", label)),
            (false, false) => (false, format!("{} test failed", label)),
            (false, true) => (true, format!("Negative {} test passed, failed as expected", label)),
        };
        Self { passed, message }
    }

    /// Process exit status for this verdict
    pub fn exit_code(&self) -> i32 {
        if self.passed {
            0
        } else {
            1
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
