pub mod config;
pub mod credentials;
pub mod identifier;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod submitter;
pub mod supervisor;
pub mod version;
