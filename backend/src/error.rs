use thiserror::Error;

use crate::optimizer::OptimizerError;
use crate::providers::ProviderError;
use crate::stations::StoreError;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("could not find location: {0}")]
    LocationNotFound(String),
    #[error("routing provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("station store error: {0}")]
    Store(#[from] StoreError),
    #[error("optimizer error: {0}")]
    Optimizer(#[from] OptimizerError),
}
