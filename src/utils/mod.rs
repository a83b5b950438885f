// Utility modules

pub mod crypto;
pub mod errors;
pub mod validation;

pub use crypto::*;
pub use errors::*;
pub use validation::*;
