//! PS/2 mouse driver
//!
//! Negotiates the auxiliary port of the PS/2 controller, turns on interrupt
//! delivery and reassembles the interrupt byte stream into motion packets.
//! The driver state machine and the controller handshake run against any
//! [`PortIo`](devices::ps2_dev::port::PortIo) implementation; the global,
//! interrupt-driven glue is only built for x86_64.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod constants;
pub mod devices;
pub mod interrupts;

pub use devices::ps2_dev::{
    config::MouseConfig,
    mouse::{MouseDriver, MouseError, MouseEvent, MouseResult},
};
