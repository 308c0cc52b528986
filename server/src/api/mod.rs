//! HTTP API handlers.
//!
//! - [`auth`]: login, callback and logout
//! - [`session`]: playback authorization
//! - [`live`]: stream information

pub mod auth;
pub mod live;
pub mod session;
