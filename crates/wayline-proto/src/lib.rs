pub mod telemetry;

pub use telemetry::{JsonLinesSink, TelemetryEvent, TelemetrySink};
