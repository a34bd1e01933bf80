//! Identity provider adapter for the hosted REST API.

mod dto;
mod rest;

pub use rest::RestIdentityProvider;
