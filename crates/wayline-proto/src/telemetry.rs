use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

/// One decoded vehicle message, as handed to an external broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub ts_unix_ms: i64,
    /// MAVLink message name, e.g. `GLOBAL_POSITION_INT`.
    pub topic: String,
    pub system_id: u8,
    pub component_id: u8,
    /// Debug rendering of the decoded message.
    pub body: String,
}

impl TelemetryEvent {
    pub fn now(topic: impl Into<String>, system_id: u8, component_id: u8, body: String) -> Self {
        Self {
            ts_unix_ms: time::OffsetDateTime::now_utc().unix_timestamp_nanos() as i64 / 1_000_000,
            topic: topic.into(),
            system_id,
            component_id,
            body,
        }
    }
}

/// Fire-and-forget destination for decoded messages.
///
/// Called from the transport reader thread; implementations must not block for long
/// and must swallow their own failures.
pub trait TelemetrySink: Send + Sync {
    fn publish(&self, event: TelemetryEvent);
}

/// Appends one JSON object per line.
pub struct JsonLinesSink {
    out: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { out: Mutex::new(BufWriter::new(f)) })
    }
}

impl TelemetrySink for JsonLinesSink {
    fn publish(&self, event: TelemetryEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(l) => l,
            Err(e) => {
                warn!("telemetry: encode {} failed: {}", event.topic, e);
                return;
            }
        };
        let Ok(mut out) = self.out.lock() else { return; };
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            warn!("telemetry: write failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_lines_sink_appends_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.jsonl");
        let sink = JsonLinesSink::create(&path).unwrap();

        sink.publish(TelemetryEvent::now("HEARTBEAT", 1, 1, "HEARTBEAT(..)".into()));
        sink.publish(TelemetryEvent::now("MISSION_ITEM_REACHED", 1, 1, "seq: 3".into()));

        let text = std::fs::read_to_string(&path).unwrap();
        let events: Vec<TelemetryEvent> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].topic, "HEARTBEAT");
        assert_eq!(events[1].body, "seq: 3");
        assert!(events[1].ts_unix_ms >= events[0].ts_unix_ms);
    }
}
