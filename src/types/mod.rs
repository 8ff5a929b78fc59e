pub mod trading;

pub use trading::{PositionSide, normalize_symbol};
