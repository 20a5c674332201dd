//! In-process graph storage

mod memory;

pub use memory::MemoryGraph;
