//! Execution router for tooldock.
//!
//! Runs a resolved tool either on the host ([`LocalExecutor`]) or inside the
//! companion tools image ([`DockerExecutor`]). [`AutoExecutor`] picks between
//! the two per invocation and [`ExecutionRouter`] wires everything up from
//! [`Settings`](tooldock_core::Settings).

mod auto;
mod docker;
mod executor;
mod local;
mod mode;
mod router;

pub use auto::AutoExecutor;
pub use docker::{DEFAULT_IMAGE_TOOLS, DockerExecutor};
pub use executor::{ExecOptions, ExecResult, Executor};
pub use local::{LocalExecutor, shim_dirs};
pub use mode::ExecutionMode;
pub use router::ExecutionRouter;
