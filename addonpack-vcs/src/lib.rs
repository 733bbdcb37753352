//! Version-control access for addonpack.
//!
//! The pipeline only ever *reads* history: it resolves references, describes
//! commits relative to tags and exports trees. All of that sits behind the
//! [`VcsPort`] trait so the resolver and stager can be driven by a real `git`
//! binary ([`ShellGit`]) or by an in-memory history ([`InMemoryHistory`]).

mod memory;
mod port;
mod resolver;
mod shell;

pub use memory::{InMemoryHistory, MemoryCommit};
pub use port::{TagDistance, VcsPort};
pub use resolver::{ResolveError, VersionResolver};
pub use shell::ShellGit;
