//! PS/2 controller and auxiliary device constants.

/// Data port (read: output buffer, write: input buffer).
pub const DATA_PORT: u16 = 0x60;

/// Status register (read), command register (write).
pub const STATUS_CMD_PORT: u16 = 0x64;

/// Status polls before a wait is declared timed out.
pub const POLL_LIMIT: u32 = 100_000;

/// Responses read after a device command before giving up on an ACK.
pub const ACK_RETRIES: u32 = 16;

/// Most stale bytes drained from the output buffer before reading the
/// configuration byte; the controller FIFO is far shorter.
pub const FLUSH_LIMIT: usize = 32;

/// Length of a standard PS/2 mouse packet (flags, dx, dy).
pub const PACKET_LEN: usize = 3;

/// Capacity of the decoded event queue.
pub const MOUSE_BUFFER_SIZE: usize = 32;

/// Controller commands written to the command register.
pub mod controller_cmd {
    /// Read controller configuration byte
    pub const READ_CONFIG: u8 = 0x20;
    /// Write controller configuration byte
    pub const WRITE_CONFIG: u8 = 0x60;
    /// Enable second PS/2 port
    pub const ENABLE_AUX: u8 = 0xA8;
    /// Route the next data byte to the second PS/2 port
    pub const WRITE_AUX: u8 = 0xD4;
}

/// Bytes the mouse sends back after a command.
pub mod response {
    /// Command acknowledgement
    pub const ACK: u8 = 0xFA;
    /// Command not recognized, send it again
    pub const RESEND: u8 = 0xFE;
}
