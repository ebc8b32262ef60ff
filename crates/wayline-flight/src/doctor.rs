use anyhow::Result;
use mavlink::common::MavCmd;
use wayline_geo::Coordinate;
use wayline_mission::{MissionStore, PlanType};

use crate::FlightConfig;

pub fn check_home(home: &Coordinate) -> Result<()> {
    let (lat, lon) = home.normalize();
    anyhow::ensure!(lat.abs() <= 90.0 && lon.abs() <= 180.0, "home coordinates invalid");
    Ok(())
}

/// Sequence numbers must be unique and ascending, since consumers look items up by them.
pub fn check_plan(store: &MissionStore) -> Result<()> {
    anyhow::ensure!(!store.is_empty(), "{} plan has no items", store.plan());
    for pair in store.items().windows(2) {
        anyhow::ensure!(
            pair[0].seq < pair[1].seq,
            "{} plan: item {} follows item {}",
            store.plan(),
            pair[1].seq,
            pair[0].seq
        );
    }
    if store.plan() == PlanType::Geofence {
        anyhow::ensure!(store.len() >= 3 || store.len() == 1, "geofence needs a circle or >= 3 vertices");
    }
    Ok(())
}

/// Every navigation waypoint lies within `max_radius_m` of home.
pub fn check_radius(store: &MissionStore, home: &Coordinate, max_radius_m: f64) -> Result<()> {
    anyhow::ensure!(max_radius_m >= 50.0, "max_radius_m too small");
    for item in store.items() {
        if item.command != MavCmd::MAV_CMD_NAV_WAYPOINT || (item.x == 0 && item.y == 0) {
            continue;
        }
        let d = home.distance_to(&item.coordinate());
        anyhow::ensure!(
            d <= max_radius_m,
            "item {} is {:.0}m from home (limit {:.0}m)",
            item.seq,
            d,
            max_radius_m
        );
    }
    Ok(())
}

pub fn check_flight_config(cfg: &FlightConfig) -> Result<()> {
    anyhow::ensure!(cfg.mission_send_timeout().as_secs() >= 5, "flight.mission_send_timeout_s should be >= 5");
    anyhow::ensure!(cfg.waypoint_timeout().as_secs() >= 1, "flight.waypoint_timeout_s must be > 0");
    anyhow::ensure!(
        cfg.landing_timeout() > cfg.landing_retry_delay(),
        "flight.landing_timeout_s should exceed landing_retry_delay_s"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayline_mission::MissionItem;

    fn plan(seqs: &[u16]) -> MissionStore {
        let home = Coordinate::degrees(38.1446916, -76.4279956, 0.0);
        let mut s = MissionStore::new(PlanType::Waypoint);
        for (n, seq) in seqs.iter().enumerate() {
            s.push(MissionItem::waypoint(*seq, &home.offset(200.0 * n as f64, 0.0), PlanType::Waypoint));
        }
        s
    }

    #[test]
    fn sequence_order() {
        assert!(check_plan(&plan(&[0, 1, 2])).is_ok());
        assert!(check_plan(&plan(&[0, 2, 5])).is_ok());
        assert!(check_plan(&plan(&[0, 2, 2])).is_err());
        assert!(check_plan(&plan(&[])).is_err());
    }

    #[test]
    fn radius_uses_distance_from_home() {
        let home = Coordinate::degrees(38.1446916, -76.4279956, 0.0);
        let p = plan(&[0, 1, 2, 3]);
        assert!(check_radius(&p, &home, 1000.0).is_ok());
        let err = check_radius(&p, &home, 500.0).unwrap_err();
        assert!(err.to_string().starts_with("item 3 is 600m"));
    }

    #[test]
    fn defaults_pass() {
        assert!(check_flight_config(&FlightConfig::default()).is_ok());
        assert!(check_home(&Coordinate::degrees(91.0, 0.0, 0.0)).is_err());
    }
}
