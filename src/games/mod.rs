pub mod types;
pub mod coin_flip;
pub mod roulette;
pub mod roll_over;
pub mod crash;

pub use types::*;
pub use coin_flip::{CoinChoice, CoinFlip};
pub use roulette::Roulette;
pub use roll_over::RollOver;
pub use crash::Crash;
