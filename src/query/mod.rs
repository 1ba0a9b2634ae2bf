//! Query side of the sample cache

pub mod service;
pub mod window;

pub use service::*;
pub use window::*;
