//! Container lifecycle operations for dockwatch
//!
//! Every operation forwards to the shared [`crate::engine::ContainerEngine`]:
//! - Listing, creating, starting, stopping and removing containers
//! - Waiting for exit and fetching logs
//! - Executing commands inside running containers
//! - Volume and image housekeeping

mod client;

pub use client::ContainerClient;
