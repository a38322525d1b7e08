//! Printer for headless runs: output records and the final summary.

use std::time::Duration;

use owo_colors::OwoColorize;

use crate::execution::{Channel, ExecutionStatus, OutputRecord};

pub struct RecordPrinter {
    pub color: bool,
}

impl RecordPrinter {
    /// Stdout records go to stdout; everything else goes to stderr.
    pub fn print(&self, record: &OutputRecord) {
        match record.channel {
            Channel::Stdout => println!("{}", record.text),
            channel => eprintln!("{}", self.paint(channel, &record.text)),
        }
    }

    pub fn summary(&self, status: ExecutionStatus, elapsed: Duration) {
        let line = format!("{} in {:.2}s", status.label(), elapsed.as_secs_f64());
        if !self.color {
            eprintln!("{}", line);
            return;
        }
        match status {
            ExecutionStatus::Success => eprintln!("{}", line.green()),
            ExecutionStatus::Error => eprintln!("{}", line.red()),
            _ => eprintln!("{}", line.yellow()),
        }
    }

    fn paint(&self, channel: Channel, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        match channel {
            Channel::Stdout => text.to_string(),
            Channel::Stderr => format!("{}", text.yellow()),
            Channel::Error => format!("{}", text.red()),
            Channel::Info => format!("{}", text.cyan()),
        }
    }
}
