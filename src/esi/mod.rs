//! ESI data provider: wire records and REST client

pub mod records;
pub mod rest;

pub use rest::EsiProvider;
