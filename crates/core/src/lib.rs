#![forbid(unsafe_code)]

pub mod model;
pub mod time;
pub mod wrap;

pub use time::Clock;
pub use wrap::{Wrap, wrap_array};
