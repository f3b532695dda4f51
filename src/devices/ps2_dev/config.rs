//! Mouse driver configuration

use crate::constants::{
    idt::{MOUSE_DESTINATION_CPU, MOUSE_IRQ},
    ps2::{ACK_RETRIES, POLL_LIMIT},
};

/// How the packet assembler decides a byte may start a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Accept every byte; framing is purely positional
    None,
    /// Drop candidate flags bytes that do not have bit 3 set
    AlwaysOneBit,
}

/// How the sign bits in the flags byte combine with the delta bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaEncoding {
    /// The delta byte is a magnitude, negated when the sign bit is set
    SignMagnitude,
    /// The sign bit is bit 8 of a 9-bit two's complement value
    TwosComplement,
}

/// Tunables for the controller transport and the packet assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseConfig {
    /// Status polls before a wait times out
    pub poll_limit: u32,
    /// Responses read while waiting for a command ACK
    pub ack_retries: u32,
    /// Packet resynchronisation policy
    pub sync: SyncPolicy,
    /// Delta decoding
    pub encoding: DeltaEncoding,
    /// IRQ line to route
    pub irq: u8,
    /// CPU receiving the interrupt
    pub destination_cpu: u8,
    /// Largest X position the accumulator reaches
    pub max_x: u16,
    /// Largest Y position the accumulator reaches
    pub max_y: u16,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MouseConfig {
    /// Configuration matching a standard PS/2 mouse on IRQ 12, CPU 0
    pub const fn new() -> Self {
        Self {
            poll_limit: POLL_LIMIT,
            ack_retries: ACK_RETRIES,
            sync: SyncPolicy::AlwaysOneBit,
            encoding: DeltaEncoding::SignMagnitude,
            irq: MOUSE_IRQ,
            destination_cpu: MOUSE_DESTINATION_CPU,
            max_x: u16::MAX,
            max_y: u16::MAX,
        }
    }

    /// Status polls allowed per wait
    pub const fn with_poll_limit(mut self, poll_limit: u32) -> Self {
        self.poll_limit = poll_limit;
        self
    }

    /// Responses read while waiting for a command ACK
    pub const fn with_ack_retries(mut self, ack_retries: u32) -> Self {
        self.ack_retries = ack_retries;
        self
    }

    /// Choose how packet starts are recognised
    pub const fn with_sync(mut self, sync: SyncPolicy) -> Self {
        self.sync = sync;
        self
    }

    /// Choose how the sign bits combine with the delta bytes
    pub const fn with_encoding(mut self, encoding: DeltaEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Route the interrupt to `cpu` instead of the BSP
    pub const fn with_destination_cpu(mut self, cpu: u8) -> Self {
        self.destination_cpu = cpu;
        self
    }

    /// Screen size the position accumulator is clamped to
    pub const fn with_bounds(mut self, width: u16, height: u16) -> Self {
        self.max_x = width.saturating_sub(1);
        self.max_y = height.saturating_sub(1);
        self
    }
}
