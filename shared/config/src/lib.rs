mod config;
mod load;

pub use crate::config::*;
pub use load::{load, ConfigError, ConfigType};
