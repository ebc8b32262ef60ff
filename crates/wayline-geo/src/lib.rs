pub mod coordinate;

pub use coordinate::{from_dms, Coordinate, Position, EARTH_RADIUS_M, METERS_PER_DEGREE};
