//! Hardware numbers shared across the driver.

pub mod idt;
pub mod ps2;
