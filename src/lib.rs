//! Chat credential issuance and CRM transcript mirroring for a support chat
//! built on a hosted chat service.

pub mod app;
pub mod config;
pub mod credentials;
pub mod crm;
pub mod error;
pub mod session;
pub mod stream;
pub mod token;
pub mod transcript;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
