//! Asset loading/parsers.
//! Lesson 03 core: Wavefront OBJ loader producing GPU-ready interleaved
//! position+normal data.

pub mod mesh;
pub mod obj;

pub use mesh::{MeshData, MeshVertex};
pub use obj::{ObjError, ObjLoader};
