pub mod config_file;
pub mod controller;
pub mod error;
pub mod loopback;

pub use controller::Herald;
pub use error::ConfigError;
