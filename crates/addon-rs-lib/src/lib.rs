pub mod error;
pub use error::Result;
pub use error::Error;

pub mod config;
pub use config::Config;

pub mod relationship_resolver;
pub use relationship_resolver::DependencyGraph;
pub use relationship_resolver::ResolverKind;

pub mod installer;
pub use installer::InstallerAction;
pub use installer::InstallerQueue;
