//! Changelog resolution across the package registry and the source host.
//!
//! A package name is resolved to its canonical GitHub repository through
//! registry metadata, then the repository is mined for the release notes
//! covering an upgrade range, falling back through less specific strategies
//! when the range cannot be reconstructed.

/// Endpoints, timeouts and conventional file names.
pub mod config;

/// Fallback strategies that assemble changelog text for a repository.
pub mod changelog;

/// GitHub REST client implementing [`traits::RepositoryHost`].
pub mod github;

/// Source URL discovery from registry metadata.
pub mod metadata;

/// PyPI JSON API client implementing [`traits::PackageRegistry`].
pub mod pypi;

/// Facade that turns a package and version range into changelog text.
pub mod resolver;

/// Tag name parsing for plain and monorepo tagging conventions.
pub mod tags;

/// Collaborator traits for the registry and the repository host.
pub mod traits;

/// Wire types shared by the clients.
pub mod types;
