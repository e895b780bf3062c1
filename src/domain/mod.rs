pub mod asset;
pub mod lineup;
pub mod matchup;
pub mod scoring;
pub mod team;

pub use asset::*;
pub use lineup::*;
pub use matchup::*;
pub use scoring::*;
pub use team::*;
