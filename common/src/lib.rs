pub mod interpolation;
pub mod message;

pub use interpolation::*;
pub use message::*;
