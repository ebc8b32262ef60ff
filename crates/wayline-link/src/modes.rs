use mavlink::common::MavType;

// ArduPilot custom_mode numbers, per vehicle family.

const PLANE: &[(&str, u32)] = &[
    ("MANUAL", 0),
    ("CIRCLE", 1),
    ("STABILIZE", 2),
    ("TRAINING", 3),
    ("ACRO", 4),
    ("FBWA", 5),
    ("FBWB", 6),
    ("CRUISE", 7),
    ("AUTOTUNE", 8),
    ("AUTO", 10),
    ("RTL", 11),
    ("LOITER", 12),
    ("TAKEOFF", 13),
    ("AVOID_ADSB", 14),
    ("GUIDED", 15),
    ("QSTABILIZE", 17),
    ("QHOVER", 18),
    ("QLOITER", 19),
    ("QLAND", 20),
    ("QRTL", 21),
    ("QAUTOTUNE", 22),
    ("QACRO", 23),
    ("THERMAL", 24),
];

const COPTER: &[(&str, u32)] = &[
    ("STABILIZE", 0),
    ("ACRO", 1),
    ("ALT_HOLD", 2),
    ("AUTO", 3),
    ("GUIDED", 4),
    ("LOITER", 5),
    ("RTL", 6),
    ("CIRCLE", 7),
    ("LAND", 9),
    ("DRIFT", 11),
    ("SPORT", 13),
    ("FLIP", 14),
    ("AUTOTUNE", 15),
    ("POSHOLD", 16),
    ("BRAKE", 17),
    ("THROW", 18),
    ("AVOID_ADSB", 19),
    ("GUIDED_NOGPS", 20),
    ("SMART_RTL", 21),
    ("FLOWHOLD", 22),
    ("FOLLOW", 23),
    ("ZIGZAG", 24),
];

const ROVER: &[(&str, u32)] = &[
    ("MANUAL", 0),
    ("ACRO", 1),
    ("STEERING", 3),
    ("HOLD", 4),
    ("LOITER", 5),
    ("FOLLOW", 6),
    ("SIMPLE", 7),
    ("AUTO", 10),
    ("RTL", 11),
    ("SMART_RTL", 12),
    ("GUIDED", 15),
];

/// Mode table for the vehicle type reported in its heartbeat. Fixed wing is the fallback.
pub fn table(vehicle: MavType) -> &'static [(&'static str, u32)] {
    match vehicle {
        MavType::MAV_TYPE_QUADROTOR
        | MavType::MAV_TYPE_HEXAROTOR
        | MavType::MAV_TYPE_OCTOROTOR
        | MavType::MAV_TYPE_TRICOPTER
        | MavType::MAV_TYPE_HELICOPTER
        | MavType::MAV_TYPE_COAXIAL => COPTER,
        MavType::MAV_TYPE_GROUND_ROVER | MavType::MAV_TYPE_SURFACE_BOAT => ROVER,
        _ => PLANE,
    }
}

/// Case-insensitive lookup of a mode name.
pub fn lookup(vehicle: MavType, name: &str) -> Option<u32> {
    table(vehicle)
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id)
}

pub fn names(vehicle: MavType) -> Vec<&'static str> {
    table(vehicle).iter().map(|(n, _)| *n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_differs_per_vehicle() {
        assert_eq!(lookup(MavType::MAV_TYPE_FIXED_WING, "AUTO"), Some(10));
        assert_eq!(lookup(MavType::MAV_TYPE_QUADROTOR, "auto"), Some(3));
        assert_eq!(lookup(MavType::MAV_TYPE_GROUND_ROVER, "HOLD"), Some(4));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(lookup(MavType::MAV_TYPE_FIXED_WING, "LAND"), None);
        assert_eq!(lookup(MavType::MAV_TYPE_QUADROTOR, "FBWA"), None);
        assert!(names(MavType::MAV_TYPE_FIXED_WING).contains(&"QLAND"));
    }
}
