//! Request/response plumbing over a partitioned publish/subscribe log.
//!
//! The pieces, leaves first:
//! - [`Envelope`] and [`Correlation`]: the message shape and the matching
//!   policy (correlation token header, or plain key equality for workflows
//!   that predate tokens).
//! - [`MessageSource`] / [`MessageSink`]: the transport seam. [`kafka`]
//!   provides the broker-backed implementations, [`mem`] an in-process bus
//!   for tests.
//! - [`CorrelatedChannel`]: send a request, then read-and-filter a shared
//!   response topic until the matching reply arrives or the wait times out.
//! - [`Worker`] and [`Controller`]: cancellable processing loops and the
//!   fail-fast supervisor that runs them as one unit.

pub mod channel;
pub mod controller;
pub mod envelope;
pub mod error;
pub mod kafka;
pub mod mem;
pub mod transport;
pub mod worker;

pub use channel::{CorrelatedChannel, send_json};
pub use controller::Controller;
pub use envelope::{CORRELATION_HEADER, Correlation, Envelope};
pub use error::{ChannelError, StopError, TransportError, WorkerError};
pub use transport::{MessageSink, MessageSource};
pub use worker::{Worker, shutdown_requested};
