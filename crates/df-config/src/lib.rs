pub mod factory;
pub mod paths;

pub use factory::FactoryConfig;
pub use paths::ConfigPaths;
