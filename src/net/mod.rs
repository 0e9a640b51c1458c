//! Socket-level plumbing shared by probers and servers

pub mod interface;
pub mod socket;

pub use interface::{select_source_address, BoundInterface};
pub use socket::{configure, new_socket, SctpInitMsg, SocketOptions};
