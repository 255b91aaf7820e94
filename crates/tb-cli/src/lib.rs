pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod evaluation;
pub mod logging;
pub mod outbound;
pub mod runner;
