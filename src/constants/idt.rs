//! Interrupt vector and IRQ line assignments.

/// Vector number the I/O APIC delivers the PS/2 mouse interrupt on.
pub const MOUSE_VECTOR: u8 = 44;

/// Legacy IRQ line of the PS/2 auxiliary port.
pub const MOUSE_IRQ: u8 = 12;

/// CPU that receives mouse interrupts unless configured otherwise.
pub const MOUSE_DESTINATION_CPU: u8 = 0;
