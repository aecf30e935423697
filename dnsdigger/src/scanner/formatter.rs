use super::*;

/// What a worker reports after handling one candidate name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    /// The name has an `A` record.
    Found { fqc: String },
    /// The lookup came back empty or failed.
    NotFound { fqc: String, reason: String },
    /// The cache already held an outcome; no lookup was made.
    Cached { fqc: String, resolved: bool },
    /// No label is pending and no worker is busy.
    Idle,
}

impl ScanEvent {
    pub fn fqc(&self) -> Option<&str> {
        match self {
            Self::Found { fqc } | Self::NotFound { fqc, .. } | Self::Cached { fqc, .. } => {
                Some(fqc)
            }
            Self::Idle => None,
        }
    }
}

/// Trait for formatting scan events.
///
/// A `LogFormatter` defines how [`ScanEvent`]s are turned into the records
/// published on the scanner's log stream.
pub trait LogFormatter: Send + Sync + 'static {
    type Output: Send + Sync + 'static + Clone + Debug;

    fn format(&self, event: &ScanEvent) -> Self::Output;

    /// Record broadcast when the scanner becomes idle.
    fn idle_output(&self) -> Self::Output {
        self.format(&ScanEvent::Idle)
    }

    fn is_idle_signal(&self, output: &Self::Output) -> bool;
}

/// Formats events as console lines (`+ FOUND: www.example.com`).
#[derive(Default)]
pub struct RawFormatter;
/// Keeps events as structured Rust values ([`ScanRecord`]).
#[derive(Default)]
pub struct StructuredFormatter;
/// Formats events as one JSON object per line.
#[derive(Default)]
pub struct JsonFormatter;

/// Structured representation of a scanner log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanRecord {
    pub event: ScanEvent,
    /// Tokio task id of the worker, empty for idle records.
    pub worker: String,
}

const IDLE_LINE: &str = "~ IDLE";

impl LogFormatter for RawFormatter {
    type Output = String;

    fn format(&self, event: &ScanEvent) -> Self::Output {
        match event {
            ScanEvent::Found { fqc } => format!("+ FOUND: {fqc}"),
            ScanEvent::NotFound { fqc, reason } => format!("- {fqc} ({reason})"),
            ScanEvent::Cached { fqc, resolved } => {
                format!("= CACHED: {fqc} ({})", if *resolved { "valid" } else { "invalid" })
            }
            ScanEvent::Idle => IDLE_LINE.to_string(),
        }
    }

    fn is_idle_signal(&self, output: &Self::Output) -> bool {
        output == IDLE_LINE
    }
}

impl LogFormatter for StructuredFormatter {
    type Output = ScanRecord;

    fn format(&self, event: &ScanEvent) -> Self::Output {
        let worker = match event {
            ScanEvent::Idle => String::new(),
            _ => tokio::task::try_id().map(|id| id.to_string()).unwrap_or_default(),
        };

        ScanRecord {
            event: event.clone(),
            worker,
        }
    }

    fn is_idle_signal(&self, output: &Self::Output) -> bool {
        output.event == ScanEvent::Idle
    }
}

impl LogFormatter for JsonFormatter {
    type Output = String;

    fn format(&self, event: &ScanEvent) -> Self::Output {
        // A plain enum of strings and bools always serializes.
        serde_json::to_string(event).unwrap_or_default()
    }

    fn is_idle_signal(&self, output: &Self::Output) -> bool {
        matches!(
            serde_json::from_str::<ScanEvent>(output),
            Ok(ScanEvent::Idle)
        )
    }
}
