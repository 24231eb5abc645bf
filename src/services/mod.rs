pub mod comparators;
pub mod levels;
pub mod modifiers;
pub mod player_events;
pub mod profile;
pub mod scoring_engine;
pub mod tracker;

pub use comparators::*;
pub use levels::*;
pub use modifiers::*;
pub use player_events::*;
pub use profile::*;
pub use scoring_engine::*;
pub use tracker::*;
