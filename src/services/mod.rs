mod recommender_service;
mod vector_service;

pub use recommender_service::RecommenderService;
pub use vector_service::{BuildReport, VectorService};
