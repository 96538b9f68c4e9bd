//! Echo service.
//!
//! `hello.v1.TestService/Hello` returns the request message unchanged. It
//! exists to prove the server is reachable and wired correctly.

pub mod v1;
