use crate::error::PrintError;
use crate::restore::{Fidelity, RestoreReport};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// JSON-lines sink for `print.*` diagnostics. Writes are best-effort; a
/// failing log file never fails a print run.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: BTreeMap<&'static str, u64>,
}

/// How one splittable table ended up, as reported by `print.table_split`.
pub(crate) enum TableEvent<'a> {
    Split { rows: usize, fragments: usize },
    Skipped(&'a PrintError),
    Failed(&'a PrintError),
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: BTreeMap::new(),
            })),
        })
    }

    pub fn step(&self, run_id: u64, step: &str, error: Option<&PrintError>, elapsed_ms: f64) {
        let error_json = match error {
            Some(err) => format!("\"{}\"", json_escape(&err.to_string())),
            None => "null".to_string(),
        };
        self.write_line(&format!(
            "{{\"type\":\"print.step\",\"run_id\":{},\"step\":\"{}\",\"ok\":{},\"error\":{},\"ms\":{:.3}}}",
            run_id,
            step,
            error.is_none(),
            error_json,
            elapsed_ms
        ));
        if error.is_some() {
            self.increment("print.step_failed", 1);
        }
    }

    pub fn table_split(&self, run_id: u64, event: TableEvent<'_>) {
        let body = match event {
            TableEvent::Split { rows, fragments } => {
                self.increment("tables.split", 1);
                self.increment("tables.fragments", fragments as u64);
                format!(
                    "\"status\":\"split\",\"rows\":{},\"fragments\":{}",
                    rows, fragments
                )
            }
            TableEvent::Skipped(err) => {
                self.increment("tables.skipped", 1);
                failure_json("skipped", err)
            }
            TableEvent::Failed(err) => {
                self.increment("tables.failed", 1);
                failure_json("failed", err)
            }
        };
        self.write_line(&format!(
            "{{\"type\":\"print.table_split\",\"run_id\":{},{}}}",
            run_id, body
        ));
    }

    /// `page` is 1-based.
    pub fn page_break(&self, run_id: u64, block: usize, page: usize) {
        self.write_line(&format!(
            "{{\"type\":\"print.page_break\",\"run_id\":{},\"block\":{},\"page\":{}}}",
            run_id, block, page
        ));
        self.increment("print.page_break", 1);
    }

    pub fn overflow(&self, run_id: u64, block: usize, height: u32, usable_page_px: u32) {
        self.write_line(&format!(
            "{{\"type\":\"print.overflow\",\"run_id\":{},\"block\":{},\"height\":{},\"usable\":{}}}",
            run_id, block, height, usable_page_px
        ));
        self.increment("print.overflow", 1);
    }

    pub fn restore(&self, run_id: u64, report: &RestoreReport) {
        let fidelity = match report.fidelity {
            Fidelity::Identical => "identical",
            Fidelity::Diverged => "diverged",
            Fidelity::Unchecked => "unchecked",
        };
        self.write_line(&format!(
            "{{\"type\":\"print.restore\",\"run_id\":{},\"restored\":{},\"removed\":{},\"fallbacks\":{},\"fidelity\":\"{}\"}}",
            run_id, report.restored, report.removed_generated, report.fallbacks, fidelity
        ));
        self.increment("restore.fallbacks", report.fallbacks as u64);
    }

    pub fn increment(&self, key: &'static str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// Writes a `debug.summary` line with the counters gathered since the
    /// last summary, then resets them.
    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let counts: Vec<String> = std::mem::take(&mut state.counters)
                .into_iter()
                .map(|(key, value)| format!("\"{}\":{}", key, value))
                .collect();
            let _ = writeln!(
                state.writer,
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{{{}}}}}",
                json_escape(context),
                counts.join(",")
            );
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }

    fn write_line(&self, json: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
        }
    }
}

fn failure_json(status: &str, err: &PrintError) -> String {
    format!(
        "\"status\":\"{}\",\"reason\":\"{}\"",
        status,
        json_escape(&err.to_string())
    )
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}
