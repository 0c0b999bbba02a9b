//! RNV Data Hub client.
//!
//! The Data Hub is a GraphQL API behind an Azure AD client-credentials
//! flow: a token is requested from the tenant's token endpoint and sent as
//! a bearer token with every query. Tokens carry an `expires_on` timestamp
//! and are refreshed by the coordinator's `TokenGuard`.

mod client;
mod query;

pub use client::{DEFAULT_API_URL, RnvClient, RnvConfig, oauth_url};
pub use query::station_journeys;
