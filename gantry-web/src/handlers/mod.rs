//! HTTP request handlers outside the controller tree

pub mod health;
pub mod navigation;
pub mod types;

pub use health::*;
pub use navigation::*;
pub use types::*;
