//! PS/2 Controller management
//!
//! This module handles the byte-level exchange with the PS/2 controller and
//! the auxiliary device behind it. Every wait is bounded: running out of
//! polls is reported to the caller as a [`ControllerError`] instead of
//! carrying on with whatever happens to sit in the data port.

use super::{config::MouseConfig, port::PortIo};
use crate::constants::ps2::{controller_cmd, response, DATA_PORT, STATUS_CMD_PORT};
use core::fmt;
use log::{trace, warn};
use ps2::flags::{ControllerConfigFlags, ControllerStatusFlags};

/// Which way a wait is looking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Input buffer empty, the controller accepts a byte
    Send,
    /// Output buffer full, a byte is waiting to be read
    Receive,
}

/// Commands understood by the mouse itself
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Enable data reporting (streaming mode)
    EnableReporting = 0xF4,
    /// Restore default sample rate, resolution and scaling
    SetDefaults = 0xF6,
}

/// Controller transport errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerError {
    /// The status register never reached the awaited state
    Timeout(Direction),
    /// The device did not acknowledge a command within the retry budget
    NoAcknowledge {
        /// Command byte that went unacknowledged
        command: u8,
    },
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(Direction::Send) => {
                write!(f, "Timeout waiting for PS/2 controller input buffer")
            }
            Self::Timeout(Direction::Receive) => {
                write!(f, "Timeout waiting for PS/2 controller output buffer")
            }
            Self::NoAcknowledge { command } => {
                write!(f, "Mouse did not acknowledge command {:#04x}", command)
            }
        }
    }
}

/// A PS/2 controller reached through a [`PortIo`] implementation
#[derive(Debug)]
pub struct Controller<P> {
    ports: P,
    poll_limit: u32,
    ack_retries: u32,
}

impl<P: PortIo> Controller<P> {
    /// Wrap `ports`, taking the wait bounds from `config`
    pub fn new(ports: P, config: &MouseConfig) -> Self {
        Self {
            ports,
            poll_limit: config.poll_limit,
            ack_retries: config.ack_retries,
        }
    }

    /// Take new wait bounds from `config`
    pub fn set_wait_bounds(&mut self, config: &MouseConfig) {
        self.poll_limit = config.poll_limit;
        self.ack_retries = config.ack_retries;
    }

    /// The underlying port implementation
    pub fn ports(&self) -> &P {
        &self.ports
    }

    /// Mutable access to the underlying ports, bypassing the wait bounds
    pub fn ports_mut(&mut self) -> &mut P {
        &mut self.ports
    }

    /// Read the status register
    pub fn read_status(&mut self) -> ControllerStatusFlags {
        ControllerStatusFlags::from_bits_truncate(self.ports.read_port(STATUS_CMD_PORT))
    }

    /// Poll the status register until `direction` is ready
    pub fn await_ready(&mut self, direction: Direction) -> Result<(), ControllerError> {
        for _ in 0..self.poll_limit {
            let status = self.read_status();
            let ready = match direction {
                Direction::Send => !status.contains(ControllerStatusFlags::INPUT_FULL),
                Direction::Receive => status.contains(ControllerStatusFlags::OUTPUT_FULL),
            };
            if ready {
                return Ok(());
            }
            core::hint::spin_loop();
        }

        warn!(
            "PS/2 controller not ready for {:?} after {} polls",
            direction, self.poll_limit
        );
        Err(ControllerError::Timeout(direction))
    }

    /// Write a byte to the command register
    pub fn write_command(&mut self, command: u8) -> Result<(), ControllerError> {
        self.await_ready(Direction::Send)?;
        self.ports.write_port(STATUS_CMD_PORT, command);
        Ok(())
    }

    /// Write a byte to the data port
    pub fn write_data(&mut self, data: u8) -> Result<(), ControllerError> {
        self.await_ready(Direction::Send)?;
        self.ports.write_port(DATA_PORT, data);
        Ok(())
    }

    /// Wait for and read a byte from the data port
    pub fn read_data(&mut self) -> Result<u8, ControllerError> {
        self.await_ready(Direction::Receive)?;
        Ok(self.ports.read_port(DATA_PORT))
    }

    /// Read the data port only if the output buffer is full
    pub fn try_read_data(&mut self) -> Option<u8> {
        if self.read_status().contains(ControllerStatusFlags::OUTPUT_FULL) {
            Some(self.ports.read_port(DATA_PORT))
        } else {
            None
        }
    }

    /// Discard whatever is waiting in the output buffer, reading at most
    /// `limit` bytes, and return how many were dropped
    pub fn flush_output(&mut self, limit: usize) -> usize {
        let mut flushed = 0;
        while flushed < limit && self.try_read_data().is_some() {
            flushed += 1;
        }
        if flushed > 0 {
            trace!("Flushed {} stale byte(s) from the PS/2 output buffer", flushed);
        }
        flushed
    }

    /// Read the controller configuration byte
    pub fn read_config(&mut self) -> Result<ControllerConfigFlags, ControllerError> {
        self.write_command(controller_cmd::READ_CONFIG)?;
        Ok(ControllerConfigFlags::from_bits_truncate(self.read_data()?))
    }

    /// Write the controller configuration byte
    pub fn write_config(&mut self, config: ControllerConfigFlags) -> Result<(), ControllerError> {
        self.write_command(controller_cmd::WRITE_CONFIG)?;
        self.write_data(config.bits())
    }

    /// Enable the second PS/2 port
    pub fn enable_aux_port(&mut self) -> Result<(), ControllerError> {
        self.write_command(controller_cmd::ENABLE_AUX)
    }

    /// Route `command` to the mouse and wait for its acknowledgement
    ///
    /// Unrelated bytes are discarded and a RESEND reissues the command; both
    /// count against the retry budget.
    pub fn send_device_command(&mut self, command: DeviceCommand) -> Result<(), ControllerError> {
        let command = command as u8;
        self.route_to_aux(command)?;

        for _ in 0..self.ack_retries {
            match self.read_data() {
                Ok(response::ACK) => return Ok(()),
                Ok(response::RESEND) => {
                    trace!("Mouse asked for command {:#04x} again", command);
                    self.route_to_aux(command)?;
                }
                Ok(other) => trace!("Discarding {:#04x} while waiting for ACK", other),
                Err(ControllerError::Timeout(_)) => break,
                Err(e) => return Err(e),
            }
        }

        warn!("Mouse did not acknowledge command {:#04x}", command);
        Err(ControllerError::NoAcknowledge { command })
    }

    fn route_to_aux(&mut self, byte: u8) -> Result<(), ControllerError> {
        self.write_command(controller_cmd::WRITE_AUX)?;
        self.write_data(byte)
    }
}

#[cfg(target_arch = "x86_64")]
pub use global::*;

#[cfg(target_arch = "x86_64")]
mod global {
    use super::Controller;
    use crate::devices::ps2_dev::{config::MouseConfig, port::Ps2Ports};
    use core::sync::atomic::{AtomicBool, Ordering};
    use spin::Mutex;

    /// The global PS/2 controller, shared by every PS/2 device driver
    static PS2_CONTROLLER: Mutex<Option<Controller<Ps2Ports>>> = Mutex::new(None);

    /// Has the controller been initialized
    static CONTROLLER_INITIALIZED: AtomicBool = AtomicBool::new(false);

    /// Take ownership of the i8042 ports
    ///
    /// Once the controller exists, later calls only replace its wait bounds.
    pub fn init(config: &MouseConfig) {
        let mut lock = PS2_CONTROLLER.lock();
        match lock.as_mut() {
            Some(controller) => controller.set_wait_bounds(config),
            None => {
                // SAFETY: the legacy PS/2 ports are only ever touched through this lock
                let ports = unsafe { Ps2Ports::new() };
                *lock = Some(Controller::new(ports, config));
                CONTROLLER_INITIALIZED.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Perform an operation with the PS/2 controller
    ///
    /// The closure runs with the controller lock held, so a device driver's
    /// command/response exchange is never interleaved with another's.
    pub fn with_controller<F, R>(f: F) -> Option<R>
    where
        F: FnOnce(&mut Controller<Ps2Ports>) -> R,
    {
        let mut lock = PS2_CONTROLLER.lock();
        (*lock).as_mut().map(f)
    }

    /// Check if the PS/2 controller is initialized
    pub fn is_initialized() -> bool {
        CONTROLLER_INITIALIZED.load(Ordering::SeqCst)
    }
}
