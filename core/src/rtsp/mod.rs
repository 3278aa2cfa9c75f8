//! RTSP request/response grammar.
//!
//! Deliberately **not** RFC 2326 general-form: messages are split on
//! `\n` (not `\r\n`), fields are read positionally by line index, and
//! method names are matched case-sensitively. This mirrors the Python
//! reference implementation exactly (see spec §9's open question on
//! parsing strictness) rather than the tolerant, header-search parser a
//! general-purpose RTSP stack would use.

pub mod request;
pub mod response;

pub use request::RtspRequest;
pub use response::RtspResponse;
