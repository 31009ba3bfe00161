pub mod block;
pub mod blockchain;
pub mod error;

pub use block::{Block, GENESIS_DIFFICULTY, SEAL_DIFFICULTY};
pub use blockchain::Blockchain;
pub use error::ChainError;
