//! Simulated i8042 for host-side tests
//!
//! Records every port write and answers reads the way a controller with a
//! well-behaved mouse behind it would, with knobs for the failure modes the
//! driver has to survive.

use super::port::PortIo;
use crate::constants::ps2::{controller_cmd, response, DATA_PORT, STATUS_CMD_PORT};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Nothing,
    ConfigByte,
    AuxByte,
}

#[derive(Debug)]
pub struct SimController {
    /// Every write in order, as (port, value)
    pub writes: Vec<(u16, u8)>,
    /// Controller configuration byte
    pub config: u8,
    /// Status register reports INPUT_FULL forever
    pub input_stuck: bool,
    /// Device never answers commands
    pub withhold_ack: bool,
    /// Bytes the device emits before its ACK
    pub noise_before_ack: Vec<u8>,
    /// Number of RESEND responses before the device ACKs
    pub resends: u32,
    /// Status register reads so far
    pub status_reads: usize,
    output: VecDeque<(u8, bool)>,
    pending: Pending,
}

impl SimController {
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            config: 0x45,
            input_stuck: false,
            withhold_ack: false,
            noise_before_ack: Vec::new(),
            resends: 0,
            status_reads: 0,
            output: VecDeque::new(),
            pending: Pending::Nothing,
        }
    }

    /// Queue bytes as if the mouse had sent them
    pub fn push_mouse_bytes(&mut self, bytes: &[u8]) {
        self.output.extend(bytes.iter().map(|&b| (b, true)));
    }

    /// Queue a byte as if the keyboard had sent it
    pub fn push_keyboard_byte(&mut self, byte: u8) {
        self.output.push_back((byte, false));
    }

    pub fn pending_output(&self) -> usize {
        self.output.len()
    }

    /// Commands that were routed to the auxiliary device
    pub fn device_commands(&self) -> Vec<u8> {
        self.writes
            .windows(2)
            .filter(|w| {
                w[0] == (STATUS_CMD_PORT, controller_cmd::WRITE_AUX) && w[1].0 == DATA_PORT
            })
            .map(|w| w[1].1)
            .collect()
    }

    fn device_command(&mut self) {
        if self.withhold_ack {
            return;
        }
        let noise: Vec<u8> = self.noise_before_ack.drain(..).collect();
        self.push_mouse_bytes(&noise);
        if self.resends > 0 {
            self.resends -= 1;
            self.push_mouse_bytes(&[response::RESEND]);
        } else {
            self.push_mouse_bytes(&[response::ACK]);
        }
    }
}

impl PortIo for SimController {
    fn read_port(&mut self, port: u16) -> u8 {
        match port {
            STATUS_CMD_PORT => {
                self.status_reads += 1;
                let mut status = 0x04;
                if let Some(&(_, aux)) = self.output.front() {
                    status |= 0x01;
                    if aux {
                        status |= 0x20;
                    }
                }
                if self.input_stuck {
                    status |= 0x02;
                }
                status
            }
            DATA_PORT => self.output.pop_front().map(|(b, _)| b).unwrap_or(0),
            _ => 0xFF,
        }
    }

    fn write_port(&mut self, port: u16, value: u8) {
        self.writes.push((port, value));
        match (port, value) {
            (STATUS_CMD_PORT, controller_cmd::READ_CONFIG) => {
                let config = self.config;
                self.output.push_back((config, false));
            }
            (STATUS_CMD_PORT, controller_cmd::WRITE_CONFIG) => self.pending = Pending::ConfigByte,
            (STATUS_CMD_PORT, controller_cmd::WRITE_AUX) => self.pending = Pending::AuxByte,
            (STATUS_CMD_PORT, _) => {}
            (DATA_PORT, _) => {
                match self.pending {
                    Pending::ConfigByte => self.config = value,
                    Pending::AuxByte => self.device_command(),
                    Pending::Nothing => {}
                }
                self.pending = Pending::Nothing;
            }
            _ => {}
        }
    }
}
