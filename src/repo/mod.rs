//! Repository checkouts kept in sync with their remotes.
//!
//! Each repository is cloned once into `<build_root>/<fingerprint(url)>` and
//! refreshed afterwards with fast-forward pulls.
//!
//! - [`RepositoryManager`]: create / pull / status operations over stored records
//! - [`GitCli`]: clone and pull through the `git` binary
//! - [`Repository`]: the persisted record

pub mod git;
pub mod manager;
pub mod repository;

pub use git::{GitCli, PullOutcome};
pub use manager::{CreateOutcome, RepositoryManager};
pub use repository::{checkout_dir, validate_remote_name, CloneStatus, Repository};
