pub mod pool;
pub mod position;
pub mod token;
pub mod volume;

pub use pool::PoolState;
pub use position::{Position, PositionSnapshot};
pub use token::TokenInfo;
pub use volume::VolumeSample;
