//! Concrete artifact kinds
//!
//! Each kind supplies one or more dependency capabilities; none of them is
//! known to the scheduler by type.

pub mod cmake;
pub mod jar;
pub mod jextract;
pub mod platform;
pub mod probe;

pub use cmake::CMake;
pub use jar::Jar;
pub use jextract::JExtract;
pub use platform::{FixedAvailability, HostMarker, HostOs};
pub use probe::{CMakeProbe, ProbeSpec};
