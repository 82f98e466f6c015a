//! Domain types
//!
//! `Session` is the checkpoint snapshot, `SessionPatch` the only out-of-band
//! change it accepts, and `Node` names the workflow steps.

mod node;
mod patch;
mod session;

pub use node::Node;
pub use patch::SessionPatch;
pub use session::{CacheMatch, Provenance, Session, SessionStatus, TransitionError, Verdict};
