//! Bulk loading of community survey datasets

pub mod loader;

pub use loader::{load_dataset, load_dataset_path, load_dataset_str, Dataset, LoadReport, PersonEntry};
