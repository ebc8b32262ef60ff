//! QGC WPL 110 text format.
//!
//! One header line, then one tab separated row per item:
//! `seq current frame command p1 p2 p3 p4 lat lon alt autocontinue`.

use mavlink::common::{MavCmd, MavFrame};
use num_traits::FromPrimitive;
use std::str::FromStr;

use crate::{MissionError, MissionItem, PlanType};

pub const HEADER: &str = "QGC WPL 110";

const FIELDS: usize = 12;

/// Drop a trailing `#` comment and surrounding whitespace. `None` for lines with nothing left.
pub fn strip(line: &str) -> Option<&str> {
    let body = match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    };
    let body = body.trim();
    (!body.is_empty()).then_some(body)
}

pub fn is_header(line: &str) -> bool {
    line.starts_with("QGC WPL")
}

/// Parse one data row. `line` is the 1-based file line, used in errors.
pub fn parse_row(line: usize, row: &str, plan: PlanType) -> Result<MissionItem, MissionError> {
    let f: Vec<&str> = row.split('\t').map(str::trim).collect();
    if f.len() != FIELDS {
        return Err(malformed(line, format!("expected {} fields, found {}", FIELDS, f.len())));
    }

    let frame_code: u32 = num(line, "frame", f[2])?;
    let frame = MavFrame::from_u32(frame_code)
        .ok_or_else(|| malformed(line, format!("unknown frame {}", frame_code)))?;
    let command_code: u32 = num(line, "command", f[3])?;
    let command = MavCmd::from_u32(command_code)
        .ok_or_else(|| malformed(line, format!("unknown command {}", command_code)))?;

    let lat: f64 = num(line, "latitude", f[8])?;
    let lon: f64 = num(line, "longitude", f[9])?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(malformed(line, format!("position {}, {} out of range", lat, lon)));
    }

    Ok(MissionItem {
        seq: num(line, "seq", f[0])?,
        current: num(line, "current", f[1])?,
        frame,
        command,
        params: [
            num(line, "param1", f[4])?,
            num(line, "param2", f[5])?,
            num(line, "param3", f[6])?,
            num(line, "param4", f[7])?,
        ],
        x: (lat * 1e7).round() as i32,
        y: (lon * 1e7).round() as i32,
        z: num(line, "altitude", f[10])?,
        autocontinue: num(line, "autocontinue", f[11])?,
        plan,
    })
}

/// Canonical row text, without line terminator.
///
/// Rows already in this form come back byte for byte. Other spellings of the same
/// numbers (`30.0`, `30`) are rewritten with six decimals.
pub fn format_row(item: &MissionItem) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.7}\t{:.7}\t{:.6}\t{}",
        item.seq,
        item.current,
        item.frame as u32,
        item.command as u32,
        item.params[0],
        item.params[1],
        item.params[2],
        item.params[3],
        item.x as f64 / 1e7,
        item.y as f64 / 1e7,
        item.z,
        item.autocontinue,
    )
}

fn num<N: FromStr>(line: usize, field: &str, s: &str) -> Result<N, MissionError> {
    s.parse()
        .map_err(|_| malformed(line, format!("bad {} {:?}", field, s)))
}

fn malformed(line: usize, reason: String) -> MissionError {
    MissionError::MalformedRow { line, reason }
}
