// Client SDK for the Ripple social platform.
//
// The crate is organized the way the backend is consumed: `api` owns
// the authenticated request path (session refresh, retry, error
// dispatch), `store` owns the optimistic in-memory collections, `pager`
// owns cursor pagination, and `socket` reconciles server-pushed events
// with local optimistic state.
pub mod api;
pub mod auth;
pub mod config;
pub mod logging;
pub mod pager;
pub mod session;
pub mod socket;
pub mod store;

pub use api::{ApiClient, ApiError, ApiResult};
pub use session::Session;
