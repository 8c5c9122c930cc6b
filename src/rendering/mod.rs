pub mod batch;
pub mod common;
pub mod gpu;
pub mod image_processing;
pub mod importer;
pub mod optimizer;
