//! Mouse packet framing and decoding
//!
//! The mouse streams 3-byte packets with no delimiter: a flags byte followed
//! by the X and Y delta bytes. [`PacketAssembler`] tracks where in a packet
//! the next byte belongs and hands back each completed [`MousePacket`].

use super::config::{DeltaEncoding, SyncPolicy};
use crate::constants::ps2::PACKET_LEN;
use log::{trace, warn};
use ps2::flags::MouseMovementFlags;

/// Button state carried by a packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseButtons {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

impl From<MouseMovementFlags> for MouseButtons {
    fn from(flags: MouseMovementFlags) -> Self {
        Self {
            left: flags.contains(MouseMovementFlags::LEFT_BUTTON_PRESSED),
            right: flags.contains(MouseMovementFlags::RIGHT_BUTTON_PRESSED),
            middle: flags.contains(MouseMovementFlags::MIDDLE_BUTTON_PRESSED),
        }
    }
}

/// A complete packet as received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MousePacket {
    pub flags: MouseMovementFlags,
    pub dx_magnitude: u8,
    pub dy_magnitude: u8,
}

impl MousePacket {
    pub fn from_bytes(bytes: [u8; PACKET_LEN]) -> Self {
        Self {
            flags: MouseMovementFlags::from_bits_truncate(bytes[0]),
            dx_magnitude: bytes[1],
            dy_magnitude: bytes[2],
        }
    }

    /// Button state and signed X and Y deltas
    pub fn decode(&self, encoding: DeltaEncoding) -> (MouseButtons, i16, i16) {
        let (dx, dy) = self.deltas(encoding);
        (self.buttons(), dx, dy)
    }

    pub fn buttons(&self) -> MouseButtons {
        self.flags.into()
    }

    /// Signed X and Y deltas
    pub fn deltas(&self, encoding: DeltaEncoding) -> (i16, i16) {
        (
            apply_sign(
                self.dx_magnitude,
                self.flags.contains(MouseMovementFlags::X_SIGN_BIT),
                encoding,
            ),
            apply_sign(
                self.dy_magnitude,
                self.flags.contains(MouseMovementFlags::Y_SIGN_BIT),
                encoding,
            ),
        )
    }

    /// Either delta exceeded what nine bits can carry
    pub fn overflowed(&self) -> bool {
        self.flags
            .intersects(MouseMovementFlags::X_OVERFLOW | MouseMovementFlags::Y_OVERFLOW)
    }
}

fn apply_sign(value: u8, negative: bool, encoding: DeltaEncoding) -> i16 {
    let value = value as i16;
    match (negative, encoding) {
        (false, _) => value,
        (true, DeltaEncoding::SignMagnitude) => -value,
        (true, DeltaEncoding::TwosComplement) => value - 0x100,
    }
}

/// Where the next byte lands in the packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketState {
    AwaitingFlags,
    AwaitingDeltaX,
    AwaitingDeltaY,
}

/// Interrupt-time state machine turning the byte stream into packets
#[derive(Debug)]
pub struct PacketAssembler {
    state: PacketState,
    buffer: [u8; PACKET_LEN],
    sync: SyncPolicy,
    /// Bytes offered since the last reset
    bytes_received: u64,
    /// Bytes rejected as packet starts
    discarded: u64,
    /// Packets completed since the last reset
    packets: u64,
}

impl PacketAssembler {
    pub const fn new(sync: SyncPolicy) -> Self {
        Self {
            state: PacketState::AwaitingFlags,
            buffer: [0; PACKET_LEN],
            sync,
            bytes_received: 0,
            discarded: 0,
            packets: 0,
        }
    }

    /// Drop any partial packet and start over at a flags byte
    pub fn reset(&mut self) {
        *self = Self::new(self.sync);
    }

    pub fn state(&self) -> PacketState {
        self.state
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Feed one byte, returning the packet it completes
    pub fn push(&mut self, byte: u8) -> Option<MousePacket> {
        self.bytes_received += 1;

        match self.state {
            PacketState::AwaitingFlags => {
                if self.sync == SyncPolicy::AlwaysOneBit
                    && !MouseMovementFlags::from_bits_truncate(byte)
                        .contains(MouseMovementFlags::ALWAYS_ONE)
                {
                    self.discarded += 1;
                    warn!("Dropping {:#04x}, not a packet start", byte);
                    return None;
                }
                self.buffer[0] = byte;
                self.state = PacketState::AwaitingDeltaX;
                None
            }
            PacketState::AwaitingDeltaX => {
                self.buffer[1] = byte;
                self.state = PacketState::AwaitingDeltaY;
                None
            }
            PacketState::AwaitingDeltaY => {
                self.buffer[2] = byte;
                self.state = PacketState::AwaitingFlags;
                self.packets += 1;

                let packet = MousePacket::from_bytes(self.buffer);
                trace!("Mouse packet {:02x?}", self.buffer);
                Some(packet)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(assembler: &mut PacketAssembler, bytes: &[u8]) -> Vec<MousePacket> {
        bytes.iter().filter_map(|&b| assembler.push(b)).collect()
    }

    #[test]
    fn decodes_left_button_with_positive_deltas() {
        let mut assembler = PacketAssembler::new(SyncPolicy::AlwaysOneBit);
        let packets = feed(&mut assembler, &[0x09, 0x05, 0x03]);

        assert_eq!(packets.len(), 1);
        let packet = packets[0];
        assert_eq!(
            packet.buttons(),
            MouseButtons {
                left: true,
                right: false,
                middle: false
            }
        );
        assert_eq!(packet.deltas(DeltaEncoding::SignMagnitude), (5, 3));
    }

    #[test]
    fn x_sign_bit_negates_dx() {
        let packet = MousePacket::from_bytes([0x19, 0x05, 0x03]);
        let (buttons, dx, dy) = packet.decode(DeltaEncoding::SignMagnitude);
        assert!(buttons.left);
        assert_eq!((dx, dy), (-5, 3));
    }

    #[test]
    fn y_sign_bit_negates_dy() {
        let packet = MousePacket::from_bytes([0x2E, 0x00, 0x07]);
        assert_eq!(packet.deltas(DeltaEncoding::SignMagnitude), (0, -7));
        assert_eq!(
            packet.buttons(),
            MouseButtons {
                left: false,
                right: true,
                middle: true
            }
        );
    }

    #[test]
    fn twos_complement_uses_nine_bit_deltas() {
        let packet = MousePacket::from_bytes([0x38, 0xFB, 0xFF]);
        assert_eq!(packet.deltas(DeltaEncoding::TwosComplement), (-5, -1));
        assert_eq!(packet.deltas(DeltaEncoding::SignMagnitude), (-251, -255));
    }

    #[test]
    fn overflow_bits_are_reported() {
        assert!(MousePacket::from_bytes([0x48, 0xFF, 0x00]).overflowed());
        assert!(!MousePacket::from_bytes([0x08, 0xFF, 0x00]).overflowed());
    }

    #[test]
    fn every_three_bytes_make_one_packet_in_order() {
        let mut assembler = PacketAssembler::new(SyncPolicy::None);
        let bytes: Vec<u8> = (0u8..30).collect();
        let packets = feed(&mut assembler, &bytes);

        assert_eq!(packets.len(), 10);
        for (i, packet) in packets.iter().enumerate() {
            let base = (i * 3) as u8;
            assert_eq!(packet.flags.bits(), base);
            assert_eq!(packet.dx_magnitude, base + 1);
            assert_eq!(packet.dy_magnitude, base + 2);
        }
        assert_eq!(assembler.bytes_received(), 30);
        assert_eq!(assembler.packets(), 10);
    }

    #[test]
    fn state_walks_through_the_packet() {
        let mut assembler = PacketAssembler::new(SyncPolicy::AlwaysOneBit);
        assert_eq!(assembler.state(), PacketState::AwaitingFlags);
        assembler.push(0x08);
        assert_eq!(assembler.state(), PacketState::AwaitingDeltaX);
        assembler.push(0x01);
        assert_eq!(assembler.state(), PacketState::AwaitingDeltaY);
        assert!(assembler.push(0x01).is_some());
        assert_eq!(assembler.state(), PacketState::AwaitingFlags);
    }

    #[test]
    fn resynchronises_after_a_lost_byte() {
        let mut assembler = PacketAssembler::new(SyncPolicy::AlwaysOneBit);
        // flags byte of the first packet lost; its deltas arrive first
        let packets = feed(&mut assembler, &[0x05, 0x03, 0x09, 0x01, 0x02]);

        assert_eq!(packets, vec![MousePacket::from_bytes([0x09, 0x01, 0x02])]);
        assert_eq!(assembler.discarded(), 2);
        assert_eq!(assembler.bytes_received(), 5);
    }

    #[test]
    fn without_sync_a_lost_byte_misframes() {
        let mut assembler = PacketAssembler::new(SyncPolicy::None);
        let packets = feed(&mut assembler, &[0x05, 0x03, 0x09, 0x01, 0x02, 0x08]);

        assert_eq!(
            packets,
            vec![
                MousePacket::from_bytes([0x05, 0x03, 0x09]),
                MousePacket::from_bytes([0x01, 0x02, 0x08]),
            ]
        );
    }

    #[test]
    fn reset_discards_a_partial_packet() {
        let mut assembler = PacketAssembler::new(SyncPolicy::AlwaysOneBit);
        feed(&mut assembler, &[0x08, 0x10]);
        assembler.reset();

        assert_eq!(assembler.state(), PacketState::AwaitingFlags);
        assert_eq!(assembler.bytes_received(), 0);
        let packets = feed(&mut assembler, &[0x09, 0x05, 0x03]);
        assert_eq!(packets, vec![MousePacket::from_bytes([0x09, 0x05, 0x03])]);
    }
}
