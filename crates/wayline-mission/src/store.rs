use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::wpl;
use crate::{MissionError, MissionItem, PlanType};

/// Overall budget of one upload.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(20);

/// Half-open `[start, end)` range of data rows to load, header excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadWindow {
    pub start: usize,
    /// `None` reads to the end of the file.
    pub end: Option<usize>,
    /// Renumber loaded items from this sequence instead of keeping the file's.
    pub first_seq: Option<u16>,
}

impl LoadWindow {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn range(start: usize, end: Option<usize>) -> Self {
        Self { start, end, first_seq: None }
    }

    pub fn renumbered(mut self, first_seq: u16) -> Self {
        self.first_seq = Some(first_seq);
        self
    }
}

/// Ordered plan of one type. Insertion order is transfer order.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionStore {
    items: Vec<MissionItem>,
    plan: PlanType,
    send_timeout: Duration,
}

impl MissionStore {
    pub fn new(plan: PlanType) -> Self {
        Self { items: Vec::new(), plan, send_timeout: DEFAULT_SEND_TIMEOUT }
    }

    pub fn with_send_timeout(mut self, budget: Duration) -> Self {
        self.send_timeout = budget;
        self
    }

    pub fn plan(&self) -> PlanType {
        self.plan
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    pub fn items(&self) -> &[MissionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first_seq(&self) -> Option<u16> {
        self.items.first().map(|i| i.seq)
    }

    /// Sequence of the last item, the one whose "reached" event ends this plan.
    pub fn last_seq(&self) -> Option<u16> {
        self.items.last().map(|i| i.seq)
    }

    /// Append an item, retagged with this store's plan type.
    pub fn push(&mut self, mut item: MissionItem) {
        item.plan = self.plan;
        self.items.push(item);
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    /// Load `window` of a QGC WPL file. Returns the number of items loaded.
    ///
    /// With `overwrite` the store is replaced, otherwise the items are appended. The store is
    /// untouched when loading fails.
    pub fn load_file(
        &mut self,
        path: impl AsRef<Path>,
        window: LoadWindow,
        overwrite: bool,
    ) -> Result<usize, MissionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            warn!("mission: cannot read {}: {}", path.display(), e);
            MissionError::FileNotFound(path.to_path_buf())
        })?;

        let mut lines = text
            .lines()
            .enumerate()
            .filter_map(|(i, l)| wpl::strip(l).map(|body| (i + 1, body)));

        match lines.next() {
            Some((_, first)) if wpl::is_header(first) => {}
            Some((line, _)) => {
                return Err(MissionError::MalformedRow {
                    line,
                    reason: format!("expected {:?} header", wpl::HEADER),
                })
            }
            None => return Err(MissionError::FileEmpty(path.to_path_buf())),
        }

        let rows: Vec<(usize, &str)> = lines.collect();
        if rows.is_empty() {
            return Err(MissionError::FileEmpty(path.to_path_buf()));
        }
        if window.start >= rows.len() {
            return Err(MissionError::StartOutOfRange { start: window.start, rows: rows.len() });
        }
        let end = window.end.unwrap_or(rows.len());
        if end > rows.len() || end < window.start {
            return Err(MissionError::EndOutOfRange { end, rows: rows.len() });
        }

        let mut loaded = Vec::with_capacity(end - window.start);
        for (n, (line, row)) in rows[window.start..end].iter().enumerate() {
            let mut item = wpl::parse_row(*line, row, self.plan)?;
            if let Some(first) = window.first_seq {
                item.seq = first.wrapping_add(n as u16);
            }
            loaded.push(item);
        }

        if overwrite {
            self.items.clear();
        }
        let count = loaded.len();
        self.items.extend(loaded);
        debug!(
            "mission: loaded {} {} items from {} (rows {}..{})",
            count,
            self.plan,
            path.display(),
            window.start,
            end
        );
        Ok(count)
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<(), MissionError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_string()).map_err(|e| MissionError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("mission: wrote {} items to {}", self.items.len(), path.display());
        Ok(())
    }
}

/// File form: header and one canonical row per item.
impl fmt::Display for MissionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", wpl::HEADER)?;
        for item in &self.items {
            writeln!(f, "{}", wpl::format_row(item))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CANONICAL: &str = "QGC WPL 110
0\t1\t0\t16\t0.000000\t0.000000\t0.000000\t0.000000\t38.1446916\t-76.4279956\t0.000000\t1
1\t0\t3\t22\t15.000000\t0.000000\t0.000000\t0.000000\t38.1451300\t-76.4281200\t30.000000\t1
2\t0\t3\t16\t0.000000\t0.000000\t0.000000\t0.000000\t38.1462694\t-76.4237554\t45.500000\t1
3\t0\t3\t16\t0.000000\t0.000000\t0.000000\t0.000000\t38.1471000\t-76.4201000\t45.500000\t1
";

    fn file(text: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f
    }

    #[test]
    fn load_then_save_is_byte_identical() {
        let src = file(CANONICAL);
        let mut store = MissionStore::new(PlanType::Waypoint);
        assert_eq!(store.load_file(src.path(), LoadWindow::all(), true).unwrap(), 4);

        let out = NamedTempFile::new().unwrap();
        store.save_file(out.path()).unwrap();
        assert_eq!(std::fs::read_to_string(out.path()).unwrap(), CANONICAL);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let noisy = CANONICAL.replace("QGC WPL 110\n", "QGC WPL 110\n\n# takeoff leg\n");
        let noisy = noisy.replacen("\t1\n", "\t1   # home\n", 1);
        let src = file(&noisy);
        let mut store = MissionStore::new(PlanType::Waypoint);
        store.load_file(src.path(), LoadWindow::all(), true).unwrap();
        assert_eq!(store.to_string(), CANONICAL);
    }

    #[test]
    fn window_and_renumbering() {
        let src = file(CANONICAL);
        let mut store = MissionStore::new(PlanType::Waypoint);
        store.load_file(src.path(), LoadWindow::range(1, Some(3)), true).unwrap();
        let seqs: Vec<u16> = store.items().iter().map(|i| i.seq).collect();
        assert_eq!(seqs, vec![1, 2]);

        store.load_file(src.path(), LoadWindow::range(3, None).renumbered(7), false).unwrap();
        let seqs: Vec<u16> = store.items().iter().map(|i| i.seq).collect();
        assert_eq!(seqs, vec![1, 2, 7]);
        assert_eq!(store.last_seq(), Some(7));
    }

    #[test]
    fn load_errors_have_distinct_codes() {
        use wayline_link::ErrorCode;
        let mut store = MissionStore::new(PlanType::Geofence);

        let missing = store.load_file("/definitely/not/here.waypoints", LoadWindow::all(), true);
        assert_eq!(missing.unwrap_err().code(), 201);

        let header_only = file("QGC WPL 110\n");
        let err = store.load_file(header_only.path(), LoadWindow::all(), true).unwrap_err();
        assert_eq!(err.code(), 202);
        let empty = file("");
        let err = store.load_file(empty.path(), LoadWindow::all(), true).unwrap_err();
        assert_eq!(err.code(), 202);

        let src = file(CANONICAL);
        let err = store.load_file(src.path(), LoadWindow::range(4, None), true).unwrap_err();
        assert_eq!(err, MissionError::StartOutOfRange { start: 4, rows: 4 });
        let err = store.load_file(src.path(), LoadWindow::range(0, Some(5)), true).unwrap_err();
        assert_eq!(err.code(), 204);
        let err = store.load_file(src.path(), LoadWindow::range(2, Some(1)), true).unwrap_err();
        assert_eq!(err.code(), 204);
        assert!(store.is_empty());
    }

    #[test]
    fn push_retags_plan() {
        let mut fence = MissionStore::new(PlanType::Geofence);
        let at = wayline_geo::Coordinate::degrees(38.0, -76.0, 0.0);
        fence.push(MissionItem::waypoint(0, &at, PlanType::Waypoint));
        assert_eq!(fence.items()[0].plan, PlanType::Geofence);
    }
}
