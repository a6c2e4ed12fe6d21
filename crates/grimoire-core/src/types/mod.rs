//! Core types for grimoire.

mod canonical;
mod extraction;
mod gazetteer;
mod kind;
mod mention;
mod message;

pub use canonical::*;
pub use extraction::*;
pub use gazetteer::*;
pub use kind::*;
pub use mention::*;
pub use message::*;
