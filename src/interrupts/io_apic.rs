//! I/O APIC routing
//!
//! Device drivers never program the redirection table themselves. They say
//! which vector and CPU their legacy line should reach and hand that to an
//! [`IrqRouter`] supplied by the platform, which owns the I/O APIC.

use crate::constants::idt::MOUSE_VECTOR;
use core::fmt;

/// Redirection table entries on a standard I/O APIC
pub const IOAPIC_MAX_IRQS: u8 = 24;

/// Delivery target for an ISA line
///
/// ISA lines are edge triggered and active high, delivered in fixed,
/// physical mode and unmasked once routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoApicIrqConfig {
    /// Vector number to deliver
    pub vector: u8,
    /// Destination APIC ID
    pub destination: u8,
}

/// Why a line could not be routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoApicError {
    /// No I/O APIC serves the line
    NotFound,
    /// Line number outside the redirection table
    InvalidIrq,
}

impl fmt::Display for IoApicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "I/O APIC not found"),
            Self::InvalidIrq => write!(f, "Invalid IRQ number"),
        }
    }
}

/// Platform service that enables a legacy IRQ line on a CPU
pub trait IrqRouter {
    /// Program and unmask `irq` according to `config`
    fn route_irq(&mut self, irq: u8, config: IoApicIrqConfig) -> Result<(), IoApicError>;
}

impl<F> IrqRouter for F
where
    F: FnMut(u8, IoApicIrqConfig) -> Result<(), IoApicError>,
{
    fn route_irq(&mut self, irq: u8, config: IoApicIrqConfig) -> Result<(), IoApicError> {
        if irq >= IOAPIC_MAX_IRQS {
            return Err(IoApicError::InvalidIrq);
        }
        self(irq, config)
    }
}

/// Delivery target for the PS/2 mouse line
pub fn ps2_mouse_config(destination_cpu: u8) -> IoApicIrqConfig {
    IoApicIrqConfig {
        vector: MOUSE_VECTOR,
        destination: destination_cpu,
    }
}
