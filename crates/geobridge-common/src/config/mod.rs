mod application;

pub const GEOBRIDGE_ENV_VAR_PREFIX: &str = "GEOBRIDGE__";

pub use application::*;
