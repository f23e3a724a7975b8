pub mod regression;
pub mod logistic;

pub use regression::*;
pub use logistic::*;
