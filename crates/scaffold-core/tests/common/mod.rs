pub mod utilities;

pub use utilities::*;
