//! Background Tasks Module
//!
//! Contains background tasks that run alongside a cache.
//!
//! # Tasks
//! - Janitor: Reclaims expired cache entries at a configured interval

mod janitor;

pub(crate) use janitor::{spawn_janitor, JanitorHandle};
