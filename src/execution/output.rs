//! Ordered output record for the current run.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdout,
    Stderr,
    /// Runtime errors raised by user code, gate rejections, worker faults.
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub text: String,
    pub channel: Channel,
}

impl OutputRecord {
    pub fn new(channel: Channel, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            channel,
        }
    }
}

pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1024 * 1024;

/// Append-only sink. Stdout/stderr stop being stored once `limit_bytes` is
/// reached; error and info records are always kept.
#[derive(Debug)]
pub struct OutputSink {
    records: Vec<OutputRecord>,
    used_bytes: usize,
    limit_bytes: usize,
    truncated: bool,
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::with_limit(DEFAULT_OUTPUT_LIMIT_BYTES)
    }
}

impl OutputSink {
    pub fn with_limit(limit_bytes: usize) -> Self {
        Self {
            records: Vec::new(),
            used_bytes: 0,
            limit_bytes,
            truncated: false,
        }
    }

    /// Append a record. Returns the records actually stored, which is empty
    /// when the record was dropped and holds a notice on first truncation.
    pub fn push(&mut self, record: OutputRecord) -> Vec<OutputRecord> {
        let capped = matches!(record.channel, Channel::Stdout | Channel::Stderr);
        if capped {
            if self.truncated {
                return Vec::new();
            }
            if self.used_bytes + record.text.len() > self.limit_bytes {
                self.truncated = true;
                let notice = OutputRecord::new(
                    Channel::Info,
                    format!(
                        "Output truncated: more than {} bytes were produced.",
                        self.limit_bytes
                    ),
                );
                self.records.push(notice.clone());
                return vec![notice];
            }
            self.used_bytes += record.text.len();
        }
        self.records.push(record.clone());
        vec![record]
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.used_bytes = 0;
        self.truncated = false;
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_arrival_order_across_channels() {
        let mut sink = OutputSink::default();
        sink.push(OutputRecord::new(Channel::Stdout, "a"));
        sink.push(OutputRecord::new(Channel::Stderr, "b"));
        sink.push(OutputRecord::new(Channel::Stdout, "c"));
        let order: Vec<_> = sink.records().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn truncates_once_and_keeps_errors() {
        let mut sink = OutputSink::with_limit(8);
        assert_eq!(sink.push(OutputRecord::new(Channel::Stdout, "12345")).len(), 1);
        let stored = sink.push(OutputRecord::new(Channel::Stdout, "67890"));
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].channel, Channel::Info);
        assert!(sink.push(OutputRecord::new(Channel::Stderr, "x")).is_empty());
        assert_eq!(sink.push(OutputRecord::new(Channel::Error, "boom")).len(), 1);
        assert!(sink.truncated);
        assert_eq!(sink.records().len(), 3);
    }

    #[test]
    fn clear_resets_budget() {
        let mut sink = OutputSink::with_limit(4);
        sink.push(OutputRecord::new(Channel::Stdout, "12345"));
        sink.clear();
        assert!(sink.records().is_empty());
        assert!(!sink.truncated);
        assert_eq!(sink.push(OutputRecord::new(Channel::Stdout, "1234")).len(), 1);
    }
}
