// Ordered trace of the filters that ran for one request
use std::fmt;

/// Outcome of one filter invocation as recorded in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Skipped,
    Disabled,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Skipped => "SKIPPED",
            ExecutionStatus::Disabled => "DISABLED",
            ExecutionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExecution {
    pub name: String,
    pub status: String,
    pub elapsed_ms: u64,
}

impl fmt::Display for FilterExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}][{}ms]", self.name, self.status, self.elapsed_ms)
    }
}

/// Append-only list of [`FilterExecution`] entries.
///
/// Renders as `name[status][Nms]` entries joined by `", "`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExecutionSummary {
    entries: Vec<FilterExecution>,
}

impl FilterExecutionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, status: impl fmt::Display, elapsed_ms: u64) {
        self.entries.push(FilterExecution {
            name: name.to_string(),
            status: status.to_string(),
            elapsed_ms,
        });
    }

    pub fn entries(&self) -> &[FilterExecution] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_ms(&self) -> u64 {
        self.entries.iter().map(|e| e.elapsed_ms).sum()
    }
}

impl fmt::Display for FilterExecutionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}
