//! Crease backend library.
//!
//! Credential gateway and session admission for the booking site: the
//! domain core under [`domain`], HTTP handlers under [`inbound`], hosted
//! identity and account-store adapters under [`outbound`], and server
//! assembly under [`server`].

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
