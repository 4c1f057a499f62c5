//! Rate limited client for the documents API.

mod sender;
mod transport;

pub use sender::{DocumentSender, SendOutcome};
pub use transport::{
    DryRunTransport, HttpTransport, Transport, TransportResponse, SIGNATURE_HEADER,
};
