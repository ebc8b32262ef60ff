use serde::{Deserialize, Serialize};
use std::fmt;

/// Equatorial radius used for every geodesic calculation in the workspace.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Meters spanned by one degree of latitude.
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M / 180.0 * std::f64::consts::PI;

const FIXED_SCALE: f64 = 1e7;

/// Degrees, minutes, seconds to decimal degrees.
pub fn from_dms(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// Horizontal position in one of the two encodings MAVLink uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Decimal degrees.
    Degrees { lat: f64, lon: f64 },
    /// Degrees scaled by 1e7 (the `*_INT` message encoding).
    Fixed { lat: i32, lon: i32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinate {
    pub position: Position,
    /// Meters.
    pub alt: f64,
    /// Degrees, when known.
    #[serde(default)]
    pub heading: Option<f64>,
}

impl Coordinate {
    pub fn degrees(lat: f64, lon: f64, alt: f64) -> Self {
        Self { position: Position::Degrees { lat, lon }, alt, heading: None }
    }

    pub fn fixed(lat: i32, lon: i32, alt: f64) -> Self {
        Self { position: Position::Fixed { lat, lon }, alt, heading: None }
    }

    /// Build from `(deg, min, sec)` triplets, stored as decimal degrees.
    pub fn from_dms(lat: (f64, f64, f64), lon: (f64, f64, f64), alt: f64) -> Self {
        Self::degrees(from_dms(lat.0, lat.1, lat.2), from_dms(lon.0, lon.1, lon.2), alt)
    }

    /// The sentinel `(0, 0, 0)`, used by `set_home` to mean "current position".
    pub fn origin() -> Self {
        Self::degrees(0.0, 0.0, 0.0)
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    /// Same point at a different altitude.
    pub fn with_altitude(mut self, alt: f64) -> Self {
        self.alt = alt;
        self
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.position, Position::Fixed { .. })
    }

    pub fn is_origin(&self) -> bool {
        let (lat, lon) = self.normalize();
        lat == 0.0 && lon == 0.0 && self.alt == 0.0
    }

    /// Latitude and longitude in decimal degrees, whatever the storage.
    pub fn normalize(&self) -> (f64, f64) {
        match self.position {
            Position::Degrees { lat, lon } => (lat, lon),
            Position::Fixed { lat, lon } => (lat as f64 / FIXED_SCALE, lon as f64 / FIXED_SCALE),
        }
    }

    /// Latitude and longitude scaled by 1e7, rounded to the nearest unit.
    pub fn to_fixed(&self) -> (i32, i32) {
        match self.position {
            Position::Fixed { lat, lon } => (lat, lon),
            Position::Degrees { lat, lon } => (scale(lat), scale(lon)),
        }
    }

    /// Move `distance_m` along `heading_deg` on a locally flat earth.
    ///
    /// The result keeps this coordinate's encoding and altitude.
    pub fn offset(&self, distance_m: f64, heading_deg: f64) -> Coordinate {
        let (lat, lon) = self.normalize();
        let heading = heading_deg.to_radians();

        let dy = distance_m * heading.cos();
        let dx = distance_m * heading.sin();

        let new_lat = lat + dy / METERS_PER_DEGREE;
        let new_lon = lon + dx / (METERS_PER_DEGREE * lat.to_radians().cos());

        let position = if self.is_fixed() {
            Position::Fixed { lat: scale(new_lat), lon: scale(new_lon) }
        } else {
            Position::Degrees { lat: new_lat, lon: new_lon }
        };
        Coordinate { position, alt: self.alt, heading: self.heading }
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let (lat1, lon1) = self.normalize();
        let (lat2, lon2) = other.normalize();

        let dlat = (lat2 - lat1).to_radians();
        let dlon = (lon2 - lon1).to_radians();
        let a = (dlat / 2.0).sin().powi(2)
            + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
        // rounding can push `a` just past 1 for antipodal points
        let a = a.clamp(0.0, 1.0);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Initial great-circle bearing towards `other`, in `[0, 360)`.
    pub fn bearing_to(&self, other: &Coordinate) -> f64 {
        let (lat1, lon1) = self.normalize();
        let (lat2, lon2) = other.normalize();

        let dlon = (lon2 - lon1).to_radians();
        let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());

        let x = dlon.sin() * lat2.cos();
        let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        let bearing = x.atan2(y).to_degrees();
        (bearing + 360.0) % 360.0
    }
}

fn scale(deg: f64) -> i32 {
    (deg * FIXED_SCALE).round() as i32
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.normalize() == other.normalize() && self.alt == other.alt
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lat, lon) = self.normalize();
        match self.heading {
            Some(h) => write!(f, "{:.7},{:.7},{},{}", lat, lon, self.alt, h),
            None => write!(f, "{:.7},{:.7},{}", lat, lon, self.alt),
        }
    }
}
