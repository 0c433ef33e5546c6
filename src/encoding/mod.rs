//! Numeric and encoding utilities shared by the chain modules

pub mod amount;
pub mod crc16;
pub mod hash;

pub use amount::{format_units, parse_units};
pub use crc16::crc16_xmodem;
