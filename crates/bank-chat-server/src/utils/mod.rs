pub mod error;
pub mod limiters;
pub mod logger;
pub mod similarity;

pub use error::ApiError;
pub use limiters::Limiters;
pub use similarity::{cosine_similarity, normalized_l2_distance};
