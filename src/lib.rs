pub mod banner;
pub mod config;
pub mod consts;
pub mod error;
pub mod logging;
pub mod prompts;
pub mod relay;
pub mod server;
pub mod upstream;
