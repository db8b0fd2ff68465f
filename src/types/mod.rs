pub mod asset;
pub mod schedule;
pub mod signals;
pub mod timeframe;

pub use asset::*;
pub use schedule::*;
pub use signals::*;
pub use timeframe::*;
