#![doc = include_str!("../README.md")]

mod error;
pub use error::*;

mod message;
pub use message::*;

mod outcome;
pub use outcome::*;

mod handler;
pub use handler::*;

mod collector;
pub use collector::*;

mod may;
pub use may::*;

mod sentinel;
pub use sentinel::*;
