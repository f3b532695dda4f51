//! PS/2 device management module
//!
//! This module provides the mouse side of the PS/2 controller: port access,
//! the controller command transport, packet framing and the mouse driver.

pub mod config;
pub mod controller;
pub mod mouse;
pub mod packet;
pub mod port;
pub mod queue;

#[cfg(test)]
mod sim;

#[cfg(target_arch = "x86_64")]
use crate::interrupts::io_apic::IrqRouter;

/// Initialize the PS/2 controller and bring the mouse up
#[cfg(target_arch = "x86_64")]
pub fn init(router: &mut impl IrqRouter) -> mouse::MouseResult<()> {
    mouse::init(router)
}

/// PS/2 mouse interrupt handler
///
/// Call from the handler installed for `MOUSE_VECTOR`. Acknowledging the
/// interrupt at the APIC stays with the caller.
#[cfg(target_arch = "x86_64")]
pub fn mouse_interrupt_handler() {
    mouse::mouse_handler();
}
