//! Interrupt plumbing the mouse driver depends on

#[cfg(target_arch = "x86_64")]
pub mod idt;
pub mod io_apic;
