//! File system access.

mod resource_loader;

pub use resource_loader::FsResourceLoader;
