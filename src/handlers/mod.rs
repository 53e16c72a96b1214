mod health;
pub mod identity;

pub use health::health_check;
pub use identity::{verify, whoami};
