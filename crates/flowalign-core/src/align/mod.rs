pub mod aligner;
pub mod hits;
pub mod lstsq;

pub use aligner::{Aligner, HittingTile};
pub use hits::{classify_hits, HitSummary};
pub use lstsq::fit_similarity;
