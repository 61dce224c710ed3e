pub mod category;
pub mod engine;

pub use category::{CategoryFilter, is_allowed};
pub use engine::{FilterEngine, FilterEvent, FilterState};
