//! Core traits (interfaces) for the EduMesh community graph

pub mod graph_backend;

pub use graph_backend::GraphBackend;
