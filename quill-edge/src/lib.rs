//! The Edge half of the quill pipeline.
//!
//! Terminates HTTP, translates each route into a task record, and blocks
//! the handler on the correlator until the Core's reply (or a deadline)
//! comes back. The Edge holds no business state: everything it serves is a
//! projection of a reply payload.

pub mod app;
pub mod correlator;
pub mod errors;
pub mod handlers;

pub use app::{create_app, EdgeState};
pub use correlator::Correlator;
pub use errors::EdgeError;
