//! Fixed face mesh triangulation shared by every avatar.

pub mod topology;

pub use topology::MeshTopology;
