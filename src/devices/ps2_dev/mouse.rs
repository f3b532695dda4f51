//! PS/2 Mouse management
//!
//! This module handles mouse initialization and interrupt-time packet
//! processing. [`MouseDriver`] holds all driver state and borrows the shared
//! [`Controller`] for each operation; the kernel-facing functions at the
//! bottom wrap a global instance and feed decoded events into a queue.

use super::{
    config::MouseConfig,
    controller::{Controller, ControllerError, DeviceCommand, Direction},
    packet::{MouseButtons, PacketAssembler},
    port::PortIo,
};
use crate::{
    constants::ps2::FLUSH_LIMIT,
    interrupts::io_apic::{ps2_mouse_config, IoApicError, IrqRouter},
};
use core::fmt;
use log::{debug, trace, warn};
use ps2::flags::{ControllerConfigFlags, ControllerStatusFlags};

/// Initialization steps, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    /// Enable the second PS/2 port
    EnableAuxPort,
    /// Read the controller configuration byte
    ReadConfig,
    /// Write it back with the mouse interrupt enabled
    WriteConfig,
    /// Restore default sample rate, resolution and scaling
    SetDefaults,
    /// Enable streaming data reporting
    EnableReporting,
}

/// PS/2 mouse error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseError {
    /// A controller exchange failed during initialization
    Init {
        step: InitStep,
        source: ControllerError,
    },
    /// The platform refused to route the mouse IRQ
    IrqRouting(IoApicError),
    /// The PS/2 controller has not been set up
    ControllerUnavailable,
}

/// Result type for mouse operations
pub type MouseResult<T> = core::result::Result<T, MouseError>;

impl fmt::Display for MouseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init { step, source } => write!(f, "Mouse init failed at {:?}: {}", step, source),
            Self::IrqRouting(e) => write!(f, "Failed to route mouse IRQ: {}", e),
            Self::ControllerUnavailable => write!(f, "PS/2 controller not initialized"),
        }
    }
}

impl From<IoApicError> for MouseError {
    fn from(error: IoApicError) -> Self {
        MouseError::IrqRouting(error)
    }
}

fn failed_at(step: InitStep) -> impl FnOnce(ControllerError) -> MouseError {
    move |source| MouseError::Init { step, source }
}

/// A decoded movement packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// Button state
    pub buttons: MouseButtons,
    /// X movement delta
    pub dx: i16,
    /// Y movement delta, positive is away from the user
    pub dy: i16,
    /// Absolute X position after applying this event
    pub x: u16,
    /// Absolute Y position after applying this event
    pub y: u16,
}

/// Running position built from successive deltas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    x: u16,
    y: u16,
    max_x: u16,
    max_y: u16,
}

impl Position {
    const fn new(max_x: u16, max_y: u16) -> Self {
        Self {
            x: 0,
            y: 0,
            max_x,
            max_y,
        }
    }

    fn apply(&mut self, dx: i16, dy: i16) {
        self.x = (self.x as i32 + dx as i32).clamp(0, self.max_x as i32) as u16;
        self.y = (self.y as i32 + dy as i32).clamp(0, self.max_y as i32) as u16;
    }

    fn set(&mut self, x: u16, y: u16) {
        self.x = x.min(self.max_x);
        self.y = y.min(self.max_y);
    }
}

/// Driver state for one PS/2 mouse
#[derive(Debug)]
pub struct MouseDriver {
    config: MouseConfig,
    assembler: PacketAssembler,
    position: Position,
    initialized: bool,
    /// Interrupts that delivered no mouse byte
    spurious: u64,
}

impl Default for MouseDriver {
    fn default() -> Self {
        Self::new(MouseConfig::new())
    }
}

impl MouseDriver {
    pub const fn new(config: MouseConfig) -> Self {
        Self {
            config,
            assembler: PacketAssembler::new(config.sync),
            position: Position::new(config.max_x, config.max_y),
            initialized: false,
            spurious: 0,
        }
    }

    pub fn config(&self) -> &MouseConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn assembler(&self) -> &PacketAssembler {
        &self.assembler
    }

    pub fn spurious_interrupts(&self) -> u64 {
        self.spurious
    }

    /// Bring the mouse up and start interrupt-driven streaming
    ///
    /// Any partial packet from before is discarded and the position returns
    /// to the origin. The first step that fails aborts the sequence and is
    /// named in the returned error.
    pub fn initialize<P: PortIo>(
        &mut self,
        controller: &mut Controller<P>,
        router: &mut impl IrqRouter,
    ) -> MouseResult<()> {
        self.initialized = false;
        self.assembler.reset();
        self.position.set(0, 0);
        self.spurious = 0;

        controller
            .enable_aux_port()
            .map_err(failed_at(InitStep::EnableAuxPort))?;

        // A streaming mouse leaves bytes behind that would otherwise be taken
        // for the configuration byte
        let stale = controller.flush_output(FLUSH_LIMIT);
        if stale > 0 {
            debug!("Dropped {} stale byte(s) before reading config", stale);
        }

        let config = controller
            .read_config()
            .map_err(failed_at(InitStep::ReadConfig))?;
        controller
            .write_config(config | ControllerConfigFlags::ENABLE_MOUSE_INTERRUPT)
            .map_err(failed_at(InitStep::WriteConfig))?;
        debug!("PS/2 config byte {:#04x}, aux interrupt enabled", config.bits());

        controller
            .send_device_command(DeviceCommand::SetDefaults)
            .map_err(failed_at(InitStep::SetDefaults))?;
        controller
            .send_device_command(DeviceCommand::EnableReporting)
            .map_err(failed_at(InitStep::EnableReporting))?;

        router.route_irq(
            self.config.irq,
            ps2_mouse_config(self.config.destination_cpu),
        )?;

        self.initialized = true;
        debug!(
            "PS/2 mouse streaming on IRQ {} to CPU {}",
            self.config.irq, self.config.destination_cpu
        );
        Ok(())
    }

    /// Service one mouse interrupt
    ///
    /// Reads at most one byte. If no mouse byte shows up within the poll
    /// bound, or the pending byte belongs to the keyboard, the interrupt is
    /// counted as spurious and the framing state is left untouched.
    pub fn handle_interrupt<P: PortIo>(
        &mut self,
        controller: &mut Controller<P>,
    ) -> Option<MouseEvent> {
        if controller.await_ready(Direction::Receive).is_err() {
            self.spurious += 1;
            return None;
        }

        if !controller
            .read_status()
            .contains(ControllerStatusFlags::MOUSE_OUTPUT_FULL)
        {
            trace!("Mouse interrupt with keyboard data pending");
            self.spurious += 1;
            return None;
        }

        match controller.try_read_data() {
            Some(byte) => self.handle_byte(byte),
            None => {
                self.spurious += 1;
                None
            }
        }
    }

    /// Feed one data byte through the packet assembler
    pub fn handle_byte(&mut self, byte: u8) -> Option<MouseEvent> {
        trace!("Mouse got {:#04x}", byte);
        let packet = self.assembler.push(byte)?;

        if packet.overflowed() {
            warn!("Mouse packet overflow, flags {:#04x}", packet.flags.bits());
        }

        let (buttons, dx, dy) = packet.decode(self.config.encoding);
        self.position.apply(dx, dy);

        debug!(
            "mouse moved: ({}, {}) left {} right {} middle {}",
            dx, dy, buttons.left, buttons.right, buttons.middle
        );

        Some(MouseEvent {
            buttons,
            dx,
            dy,
            x: self.position.x,
            y: self.position.y,
        })
    }

    /// Feed a run of bytes, yielding each completed event
    pub fn handle_bytes<'a>(
        &'a mut self,
        bytes: &'a [u8],
    ) -> impl Iterator<Item = MouseEvent> + 'a {
        bytes.iter().filter_map(move |&byte| self.handle_byte(byte))
    }

    /// Get current mouse position
    pub fn get_position(&self) -> (u16, u16) {
        (self.position.x, self.position.y)
    }

    /// Set mouse position
    pub fn set_position(&mut self, x: u16, y: u16) {
        self.position.set(x, y);
    }

    /// Set the screen boundaries for mouse movement
    pub fn set_bounds(&mut self, width: u16, height: u16) {
        self.config = self.config.with_bounds(width, height);
        self.position.max_x = self.config.max_x;
        self.position.max_y = self.config.max_y;
        let (x, y) = (self.position.x, self.position.y);
        self.position.set(x, y);
    }
}

#[cfg(target_arch = "x86_64")]
pub use global::*;

#[cfg(target_arch = "x86_64")]
mod global {
    use super::{MouseDriver, MouseError, MouseEvent, MouseResult};
    use crate::{
        constants::ps2::MOUSE_BUFFER_SIZE,
        devices::ps2_dev::{
            config::MouseConfig,
            controller,
            queue::{MouseEventQueue, MouseStream},
        },
        interrupts::{idt::without_interrupts, io_apic::IrqRouter},
    };
    use core::{
        future::poll_fn,
        sync::atomic::{AtomicU64, Ordering},
    };
    use lazy_static::lazy_static;
    use log::error;
    use spin::Mutex;

    /// The global mouse state
    ///
    /// Always locked after the controller lock, never before.
    pub static MOUSE: Mutex<MouseDriver> = Mutex::new(MouseDriver::new(MouseConfig::new()));

    lazy_static! {
        /// Events decoded by the interrupt handler
        static ref MOUSE_EVENTS: MouseEventQueue = MouseEventQueue::new(MOUSE_BUFFER_SIZE);
    }

    /// The number of mouse interrupts received
    static MOUSE_INTERRUPT_COUNT: AtomicU64 = AtomicU64::new(0);

    /// Initialize the mouse with the default configuration
    pub fn init(router: &mut impl IrqRouter) -> MouseResult<()> {
        init_with_config(MouseConfig::default(), router)
    }

    /// Initialize the mouse
    pub fn init_with_config(config: MouseConfig, router: &mut impl IrqRouter) -> MouseResult<()> {
        let result = without_interrupts(|| {
            controller::init(&config);
            controller::with_controller(|controller| {
                let mut mouse = MOUSE.lock();
                *mouse = MouseDriver::new(config);
                mouse.initialize(controller, router)
            })
            .unwrap_or(Err(MouseError::ControllerUnavailable))
        });

        if let Err(e) = &result {
            error!("{}", e);
        }
        result
    }

    /// Re-run initialization, dropping any partial packet and queued events
    pub fn reset(router: &mut impl IrqRouter) -> MouseResult<()> {
        let result = without_interrupts(|| {
            controller::with_controller(|controller| MOUSE.lock().initialize(controller, router))
                .unwrap_or(Err(MouseError::ControllerUnavailable))
        });
        MOUSE_EVENTS.clear();
        result
    }

    /// Mouse interrupt handler
    pub fn mouse_handler() {
        MOUSE_INTERRUPT_COUNT.fetch_add(1, Ordering::SeqCst);

        let event = controller::with_controller(|controller| {
            MOUSE.lock().handle_interrupt(controller)
        })
        .flatten();

        if let Some(event) = event {
            MOUSE_EVENTS.push(event);
        }
    }

    /// Get a stream of mouse events
    pub fn get_stream() -> MouseStream<'static> {
        MOUSE_EVENTS.stream()
    }

    /// Wait for and return the next mouse event
    pub async fn next_event() -> MouseEvent {
        poll_fn(|cx| MOUSE_EVENTS.poll_event(cx)).await
    }

    /// Read a mouse event without waiting
    pub fn try_read_event() -> Option<MouseEvent> {
        MOUSE_EVENTS.pop()
    }

    /// Get current mouse position
    pub fn get_position() -> (u16, u16) {
        without_interrupts(|| MOUSE.lock().get_position())
    }

    /// Set mouse position
    pub fn set_position(x: u16, y: u16) {
        without_interrupts(|| MOUSE.lock().set_position(x, y))
    }

    /// Set screen boundaries for mouse movement
    pub fn set_bounds(width: u16, height: u16) {
        without_interrupts(|| MOUSE.lock().set_bounds(width, height))
    }

    /// Get mouse interrupt count
    pub fn get_interrupt_count() -> u64 {
        MOUSE_INTERRUPT_COUNT.load(Ordering::SeqCst)
    }
}
