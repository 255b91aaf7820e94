pub mod export;
pub mod loader;
pub mod transform;
pub mod validate;

pub use export::*;
pub use loader::*;
pub use transform::*;
pub use validate::*;
