#![doc = include_str!("../README.md")]

mod allocation;
mod archive;
mod engine;
mod error;
mod identity;
mod lookup;
mod partition;
mod policy;
mod rand;
mod store;
mod sweep;
mod time;
mod token;

pub use crate::allocation::*;
pub use crate::archive::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::identity::*;
pub use crate::lookup::*;
pub use crate::partition::*;
pub use crate::policy::*;
pub use crate::rand::*;
pub use crate::store::*;
pub use crate::sweep::*;
pub use crate::time::*;
pub use crate::token::*;
