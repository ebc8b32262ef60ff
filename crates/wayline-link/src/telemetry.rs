use mavlink::common::{GLOBAL_POSITION_INT_DATA, RC_CHANNELS_DATA, WIND_COV_DATA};
use wayline_geo::Coordinate;

#[derive(Debug, Clone, PartialEq)]
pub struct GpsFix {
    /// Fixed-point lat/lon, altitude above mean sea level.
    pub position: Coordinate,
    pub relative_alt_m: f64,
    pub heading_deg: Option<f64>,
    /// Ground velocity north/east/down, m/s.
    pub velocity_ned: [f32; 3],
}

impl From<&GLOBAL_POSITION_INT_DATA> for GpsFix {
    fn from(d: &GLOBAL_POSITION_INT_DATA) -> Self {
        // altitudes are millimeters, velocities cm/s, heading cdeg (u16::MAX when unknown)
        let position = Coordinate::fixed(d.lat, d.lon, d.alt as f64 / 1000.0);
        let heading_deg = (d.hdg != u16::MAX).then(|| d.hdg as f64 / 100.0);
        Self {
            position,
            relative_alt_m: d.relative_alt as f64 / 1000.0,
            heading_deg,
            velocity_ned: [d.vx as f32 / 100.0, d.vy as f32 / 100.0, d.vz as f32 / 100.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wind {
    /// Horizontal speed, m/s.
    pub speed_mps: f32,
    /// Compass direction the air moves towards, degrees.
    pub direction_deg: f32,
    pub vertical_mps: f32,
    pub alt_m: f32,
}

impl From<&WIND_COV_DATA> for Wind {
    fn from(d: &WIND_COV_DATA) -> Self {
        let speed = (d.wind_x * d.wind_x + d.wind_y * d.wind_y).sqrt();
        let dir = (d.wind_y.atan2(d.wind_x).to_degrees() + 360.0) % 360.0;
        // NED: positive z is down
        Self { speed_mps: speed, direction_deg: dir, vertical_mps: -d.wind_z, alt_m: d.wind_alt }
    }
}

pub const RC_CHANNEL_COUNT: usize = 18;

#[derive(Debug, Clone, PartialEq)]
pub struct RcChannels {
    pub raw: [u16; RC_CHANNEL_COUNT],
    /// Channels the receiver actually reports.
    pub count: u8,
    pub rssi: u8,
}

impl RcChannels {
    /// Raw PWM value of channel `n`, 1-based like the radio labels.
    pub fn channel(&self, n: u8) -> Option<u16> {
        let idx = (n as usize).checked_sub(1)?;
        self.raw.get(idx).copied()
    }
}

impl From<&RC_CHANNELS_DATA> for RcChannels {
    fn from(d: &RC_CHANNELS_DATA) -> Self {
        Self {
            raw: [
                d.chan1_raw, d.chan2_raw, d.chan3_raw, d.chan4_raw, d.chan5_raw, d.chan6_raw,
                d.chan7_raw, d.chan8_raw, d.chan9_raw, d.chan10_raw, d.chan11_raw, d.chan12_raw,
                d.chan13_raw, d.chan14_raw, d.chan15_raw, d.chan16_raw, d.chan17_raw, d.chan18_raw,
            ],
            count: d.chancount,
            rssi: d.rssi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gps_fix_scales_units() {
        let d = GLOBAL_POSITION_INT_DATA {
            lat: 383_152_763,
            lon: -765_490_833,
            alt: 40_500,
            relative_alt: 500,
            vx: 1250,
            hdg: 28_250,
            ..Default::default()
        };
        let fix = GpsFix::from(&d);
        assert_eq!(fix.position.to_fixed(), (383_152_763, -765_490_833));
        assert_eq!(fix.position.alt, 40.5);
        assert_eq!(fix.relative_alt_m, 0.5);
        assert_eq!(fix.heading_deg, Some(282.5));
        assert_eq!(fix.velocity_ned[0], 12.5);

        let unknown = GLOBAL_POSITION_INT_DATA { hdg: u16::MAX, ..d };
        assert_eq!(GpsFix::from(&unknown).heading_deg, None);
    }

    #[test]
    fn wind_direction_is_compass() {
        let w = Wind::from(&WIND_COV_DATA { wind_x: 0.0, wind_y: -3.0, wind_z: -0.5, ..Default::default() });
        assert!((w.speed_mps - 3.0).abs() < 1e-6);
        assert!((w.direction_deg - 270.0).abs() < 1e-4);
        assert_eq!(w.vertical_mps, 0.5);
    }

    #[test]
    fn rc_channels_are_one_based() {
        let rc = RcChannels::from(&RC_CHANNELS_DATA { chan1_raw: 1100, chan7_raw: 1900, chancount: 8, ..Default::default() });
        assert_eq!(rc.channel(1), Some(1100));
        assert_eq!(rc.channel(7), Some(1900));
        assert_eq!(rc.channel(0), None);
        assert_eq!(rc.channel(19), None);
    }
}
