use serde::Deserialize;
use wayline_geo::Coordinate;
use wayline_mission::{MissionItem, PlanType};

/// Servo pulse that releases the payload.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ReleaseTrigger {
    pub servo: u8,
    pub pwm: u16,
}

const DEFAULT_BUFFER_M: f64 = 100.0;

fn default_buffer() -> f64 {
    DEFAULT_BUFFER_M
}

/// Items spliced into a mission around the drop target.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AirdropPlan {
    /// Bearing from the target to the entry waypoint, degrees. The exit lies opposite.
    #[serde(default)]
    pub heading_deg: f64,
    /// Distance of the entry and exit waypoints from the target. Zero drops both.
    #[serde(default = "default_buffer")]
    pub buffer_m: f64,
    pub release: Option<ReleaseTrigger>,
}

impl Default for AirdropPlan {
    fn default() -> Self {
        Self { heading_deg: 0.0, buffer_m: DEFAULT_BUFFER_M, release: None }
    }
}

impl AirdropPlan {
    fn buffered(&self) -> bool {
        self.buffer_m > 0.0
    }

    /// Number of items `items` produces.
    pub fn item_count(&self) -> usize {
        let buffers = if self.buffered() { 2 } else { 0 };
        1 + buffers + usize::from(self.release.is_some())
    }

    /// Entry, target, release, exit (whichever are configured), numbered from `first_seq`.
    pub fn items(&self, target: &Coordinate, altitude: f64, first_seq: u16) -> Vec<MissionItem> {
        let target = target.with_altitude(altitude);
        let mut out = Vec::with_capacity(self.item_count());
        let mut seq = first_seq;
        let mut next = || {
            let s = seq;
            seq = seq.wrapping_add(1);
            s
        };

        if self.buffered() {
            let entry = target.offset(self.buffer_m, self.heading_deg);
            out.push(MissionItem::waypoint(next(), &entry, PlanType::Waypoint));
        }
        out.push(MissionItem::waypoint(next(), &target, PlanType::Waypoint));
        if let Some(r) = self.release {
            out.push(MissionItem::set_servo(next(), r.servo, r.pwm, PlanType::Waypoint));
        }
        if self.buffered() {
            let exit = target.offset(self.buffer_m, self.heading_deg + 180.0);
            out.push(MissionItem::waypoint(next(), &exit, PlanType::Waypoint));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::common::MavCmd;

    #[test]
    fn full_pass_is_ordered_around_target() {
        let plan = AirdropPlan {
            heading_deg: 90.0,
            buffer_m: 150.0,
            release: Some(ReleaseTrigger { servo: 9, pwm: 1900 }),
        };
        let target = Coordinate::degrees(38.145, -76.428, 0.0);
        let items = plan.items(&target, 60.0, 4);

        assert_eq!(items.len(), plan.item_count());
        let seqs: Vec<u16> = items.iter().map(|i| i.seq).collect();
        assert_eq!(seqs, vec![4, 5, 6, 7]);
        assert_eq!(items[2].command, MavCmd::MAV_CMD_DO_SET_SERVO);
        assert_eq!(items[2].params[..2], [9.0, 1900.0]);

        // entry east of the target, exit west, all at drop altitude
        let t = items[1].coordinate();
        assert_eq!(t.alt, 60.0);
        assert!((t.bearing_to(&items[0].coordinate()) - 90.0).abs() < 0.5);
        assert!((t.bearing_to(&items[3].coordinate()) - 270.0).abs() < 0.5);
        assert!((t.distance_to(&items[3].coordinate()) - 150.0).abs() < 1.0);
        assert_eq!(items[3].z, 60.0);
    }

    #[test]
    fn default_plan_buffers_the_target_by_100m() {
        let plan = AirdropPlan::default();
        let target = Coordinate::degrees(38.0, -76.0, 12.0);
        let items = plan.items(&target, 40.0, 0);
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].z, 40.0);

        // entry due north at heading 0, exit due south
        let t = items[1].coordinate();
        assert!((t.distance_to(&items[0].coordinate()) - 100.0).abs() < 1.0);
        assert!(items[0].x > items[1].x && items[2].x < items[1].x);
    }

    #[test]
    fn zero_buffer_is_just_the_target() {
        let plan = AirdropPlan { buffer_m: 0.0, ..Default::default() };
        let items = plan.items(&Coordinate::degrees(38.0, -76.0, 12.0), 40.0, 0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].z, 40.0);
    }

    #[test]
    fn config_without_buffer_gets_the_default() {
        let plan: AirdropPlan = toml::from_str("heading_deg = 45.0").unwrap();
        assert_eq!(plan.buffer_m, 100.0);
        assert_eq!(plan.item_count(), 3);
    }
}
