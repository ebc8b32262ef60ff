use mavlink::common::{MavCmd, MavFrame, MavMissionType, MISSION_ITEM_INT_DATA};
use std::fmt;
use wayline_geo::Coordinate;

/// Which onboard plan a store targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanType {
    #[default]
    Waypoint,
    Geofence,
    Rally,
}

impl PlanType {
    pub fn mission_type(self) -> MavMissionType {
        match self {
            PlanType::Waypoint => MavMissionType::MAV_MISSION_TYPE_MISSION,
            PlanType::Geofence => MavMissionType::MAV_MISSION_TYPE_FENCE,
            PlanType::Rally => MavMissionType::MAV_MISSION_TYPE_RALLY,
        }
    }
}

impl TryFrom<u8> for PlanType {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, u8> {
        match v {
            0 => Ok(PlanType::Waypoint),
            1 => Ok(PlanType::Geofence),
            2 => Ok(PlanType::Rally),
            other => Err(other),
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanType::Waypoint => "waypoint",
            PlanType::Geofence => "geofence",
            PlanType::Rally => "rally",
        };
        f.write_str(s)
    }
}

/// One addressable command record of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionItem {
    pub seq: u16,
    pub current: u8,
    pub frame: MavFrame,
    pub command: MavCmd,
    pub params: [f64; 4],
    /// Latitude ×1e7.
    pub x: i32,
    /// Longitude ×1e7.
    pub y: i32,
    /// Altitude as written, meaning depends on `frame`. Narrowed to `f32` only on the wire.
    pub z: f64,
    pub autocontinue: u8,
    pub plan: PlanType,
}

impl MissionItem {
    /// `NAV_WAYPOINT` at `at`, relative-altitude frame.
    pub fn waypoint(seq: u16, at: &Coordinate, plan: PlanType) -> Self {
        let (x, y) = at.to_fixed();
        Self {
            seq,
            current: 0,
            frame: MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT,
            command: MavCmd::MAV_CMD_NAV_WAYPOINT,
            params: [0.0; 4],
            x,
            y,
            z: at.alt,
            autocontinue: 1,
            plan,
        }
    }

    /// `DO_SET_SERVO`, executed when the vehicle passes this item.
    pub fn set_servo(seq: u16, servo: u8, pwm: u16, plan: PlanType) -> Self {
        Self {
            seq,
            current: 0,
            frame: MavFrame::MAV_FRAME_MISSION,
            command: MavCmd::MAV_CMD_DO_SET_SERVO,
            params: [f64::from(servo), f64::from(pwm), 0.0, 0.0],
            x: 0,
            y: 0,
            z: 0.0,
            autocontinue: 1,
            plan,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::fixed(self.x, self.y, self.z)
    }

    /// Wire form. Target ids are filled in by the link.
    pub fn to_wire(&self) -> MISSION_ITEM_INT_DATA {
        MISSION_ITEM_INT_DATA {
            param1: self.params[0] as f32,
            param2: self.params[1] as f32,
            param3: self.params[2] as f32,
            param4: self.params[3] as f32,
            x: self.x,
            y: self.y,
            z: self.z as f32,
            seq: self.seq,
            command: self.command,
            frame: self.frame,
            current: self.current,
            autocontinue: self.autocontinue,
            mission_type: self.plan.mission_type(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waypoint_carries_fixed_position() {
        let at = Coordinate::degrees(38.1462694, -76.4237554, 35.5);
        let item = MissionItem::waypoint(3, &at, PlanType::Waypoint);
        assert_eq!((item.x, item.y), (381_462_694, -764_237_554));
        assert_eq!(item.coordinate(), Coordinate::fixed(381_462_694, -764_237_554, 35.5));

        let wire = item.to_wire();
        assert_eq!(wire.seq, 3);
        assert_eq!(wire.command, MavCmd::MAV_CMD_NAV_WAYPOINT);
        assert_eq!(wire.mission_type, MavMissionType::MAV_MISSION_TYPE_MISSION);
    }

    #[test]
    fn plan_type_codes() {
        assert_eq!(PlanType::try_from(1), Ok(PlanType::Geofence));
        assert_eq!(PlanType::try_from(7), Err(7));
        assert_eq!(PlanType::Rally.mission_type(), MavMissionType::MAV_MISSION_TYPE_RALLY);
    }
}
