#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
pub mod models;
pub mod packet;

pub use packet::{Packet, PacketError};
