// Application core

pub mod initialization;

pub use initialization::{initialize, AppContext};
