//! IRC protocol layer: connection management, frame conversion, the client
//! loop and its hooks.

pub mod client;
pub mod codec;
pub mod connection;
pub mod error;
pub mod hooks;

#[cfg(test)]
pub mod testing;

pub use client::{Client, ClientHandle, Identity, Target};
pub use error::ClientError;
pub use hooks::{Hook, HookRegistry};
