//! Byte-level port access for the PS/2 controller
//!
//! Everything above this module talks to the controller through [`PortIo`],
//! so the handshake and the packet state machine can run against a
//! simulated controller as well as the real i8042.

/// Narrow capability for reading and writing 8-bit I/O ports
pub trait PortIo {
    /// Read one byte from `port`
    fn read_port(&mut self, port: u16) -> u8;

    /// Write one byte to `port`
    fn write_port(&mut self, port: u16, value: u8);
}

impl<T: PortIo + ?Sized> PortIo for &mut T {
    fn read_port(&mut self, port: u16) -> u8 {
        (**self).read_port(port)
    }

    fn write_port(&mut self, port: u16, value: u8) {
        (**self).write_port(port, value)
    }
}

/// The legacy i8042 ports, accessed with `in`/`out` instructions
#[cfg(target_arch = "x86_64")]
#[derive(Debug)]
pub struct Ps2Ports {
    _private: (),
}

#[cfg(target_arch = "x86_64")]
impl Ps2Ports {
    /// Create a handle to the i8042 ports
    ///
    /// # Safety
    ///
    /// The caller must guarantee that ports 0x60 and 0x64 belong to a PS/2
    /// controller and that no other handle issues commands concurrently.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(target_arch = "x86_64")]
impl PortIo for Ps2Ports {
    fn read_port(&mut self, port: u16) -> u8 {
        let mut port = x86_64::instructions::port::Port::<u8>::new(port);
        // SAFETY: construction of `Ps2Ports` vouches for the port range
        unsafe { port.read() }
    }

    fn write_port(&mut self, port: u16, value: u8) {
        let mut port = x86_64::instructions::port::Port::<u8>::new(port);
        // SAFETY: construction of `Ps2Ports` vouches for the port range
        unsafe { port.write(value) }
    }
}
