pub mod channel;
pub mod command;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod family;
pub mod flashloader;
pub mod reassembly;
pub mod response;
pub mod scripted;
pub mod transport;

#[cfg(test)]
mod tests;

pub use channel::Channel;
pub use config::TransportConfig;
pub use device::{Connection, Instance};
pub use dispatch::{Family, Protocol, ProtocolBase, UserContext};
pub use error::{Error, Result};
pub use scripted::ScriptedChannel;
