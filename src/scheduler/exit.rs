/// Hook invoked when the overall run timeout expires and the configured cap
/// is at least 3600 seconds (spec.md §6's exit code 124 contract).
///
/// Injectable so the behaviour can be exercised in tests without actually
/// terminating the test process.
pub trait ProcessExit: Send + Sync {
    fn exit(&self, code: i32);
}

/// Production implementation: terminates the process.
#[derive(Debug, Default)]
pub struct RealProcessExit;

impl ProcessExit for RealProcessExit {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}
