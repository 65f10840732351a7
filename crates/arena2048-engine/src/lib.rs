pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("invalid tile value {value} at cell {index}: tiles must be 0 or a power of two >= 2")]
pub struct InvalidTileError {
    pub index: usize,
    pub value: u32,
}
