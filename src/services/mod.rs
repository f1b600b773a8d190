//! Server-side services: grant minting, object storage and video metadata.

pub mod grant_service;
pub mod layout;
pub mod metadata_store;
pub mod object_store;
pub mod signer;

#[cfg(test)]
pub(crate) mod test_support;
