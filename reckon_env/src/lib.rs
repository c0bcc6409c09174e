//! Environment Abstraction Layer for the dead-reckoning verifier
//!
//! The evaluation engine never reads the clock or a socket directly. Both
//! are reached through the traits in this crate so the same engine runs
//! against a live federation feed (tokio) and against a deterministic
//! simulation or a recorded capture.
//!
//! # Intercepted I/O
//!
//! - Time (`now()`, `system_time()`, `sleep()`)
//! - Inbound attribute updates (`UpdateSource::recv()`)
//!
//! # Example
//!
//! ```ignore
//! use reckon_env::{ReckonContext, UpdateSource};
//!
//! async fn collect<Ctx: ReckonContext, Src: UpdateSource>(ctx: &Ctx, src: &Src) {
//!     loop {
//!         tokio::select! {
//!             update = src.recv() => handle(update),
//!             _ = ctx.sleep(Duration::from_secs(30)) => break,
//!         }
//!     }
//!     src.unsubscribe();
//! }
//! ```

mod context;
mod source;
mod types;
mod error;
mod tokio_impl;

pub use context::ReckonContext;
pub use source::UpdateSource;
pub use types::{AttributeUpdate, ObjectId};
pub use error::EnvError;
pub use tokio_impl::{ChannelSource, TokioContext};
