pub mod error;
pub mod item;
pub mod store;
pub mod transfer;
pub mod wpl;

pub use error::{decode_error, MissionError};
pub use item::{MissionItem, PlanType};
pub use store::{LoadWindow, MissionStore, DEFAULT_SEND_TIMEOUT};
