//! Session authentication and the authorization policy

pub mod policy;
pub mod session_auth;

pub use policy::{Action, Authorizer, Resource, ShopRolePolicy};
pub use session_auth::{Actor, RequestContext};
