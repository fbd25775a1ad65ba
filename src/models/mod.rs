pub mod classifier;
pub mod registry;

pub use classifier::ClassificationModel;
pub use registry::ModelRegistry;
