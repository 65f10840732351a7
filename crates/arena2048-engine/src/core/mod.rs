pub use self::{board::*, direction::*};

pub(crate) mod board;
pub(crate) mod direction;
