pub mod config;
pub mod datasource;
pub mod error;
pub mod feature;
pub mod geometry;
