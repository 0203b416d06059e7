mod output;
mod python;
pub mod runner;
