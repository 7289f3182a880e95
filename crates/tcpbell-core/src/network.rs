pub mod dumbbell;
pub(crate) mod topology;
pub mod types;

pub use dumbbell::{Access, Dumbbell, DumbbellError, DumbbellSpec, WirelessAccess};
pub use topology::TopologyError;
pub use types::*;
