//! Call bridging.
//!
//! The session arena plus the per-call bridge that relays audio between the
//! telephony stream and the AI realtime session.

mod relay;
mod session;

pub use relay::{CallBridge, TelephonyEvent, build_realtime_config};
pub use session::{CallState, Session, SessionStore};
