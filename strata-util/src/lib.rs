pub mod base36;
pub mod math;
pub mod packing;

pub use packing::Packing;
