pub mod device;
pub mod measurement;
pub mod topology;

pub use device::*;
pub use measurement::*;
pub use topology::*;
