pub mod bucket;
pub mod cli;
pub mod load_config;
pub mod marketing_cloud;

pub use cli::{run, Cli, Commands};
