pub mod error;
pub mod imputer;
pub mod scaler;
pub mod encoder;
pub mod split;
pub mod transformer;

pub use error::*;
pub use imputer::*;
pub use scaler::*;
pub use encoder::*;
pub use split::*;
pub use transformer::*;
