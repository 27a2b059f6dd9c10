pub mod config;
pub mod env;
pub mod locflow_toml;
pub mod logger;

pub use config::*;
pub use env::db_path_from_env;
pub use logger::setup_logging;
