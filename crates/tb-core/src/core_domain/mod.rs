mod error;
mod job;
mod model;
pub mod poller;
mod ports;
mod record;
mod types;

pub use error::*;
pub use job::*;
pub use model::*;
pub use poller::*;
pub use ports::*;
pub use record::*;
pub use types::*;
