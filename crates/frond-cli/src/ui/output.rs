//! Plain status-line output for the CLI.

/// Handle for human-facing status lines. Diagnostics meant for machines go
/// through `tracing`; this is the part the user reads.
#[derive(Debug, Clone, Default)]
pub struct Output;

impl Output {
    /// Create a new output handle.
    pub fn new() -> Self {
        Self
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        println!("   {msg}");
    }

    /// Log a success message.
    pub fn success(&self, msg: &str) {
        println!("✓ {msg}");
    }

    /// Log a warning message.
    pub fn warning(&self, msg: &str) {
        eprintln!("! {msg}");
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        eprintln!("✗ {msg}");
    }
}
