use embedded_hal::can::{Frame, Id};

use crate::{regs::FilterHit, CanSpeed};

/// A CAN 2.0 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    rtr: bool,
    dlc: u8,
    data: [u8; 8],
}

impl Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > 8 {
            return None;
        }
        let mut bytes = [0u8; 8];
        bytes[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id.into(),
            rtr: false,
            dlc: data.len() as u8,
            data: bytes,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > 8 {
            return None;
        }
        Some(Self {
            id: id.into(),
            rtr: true,
            dlc: dlc as u8,
            data: [0u8; 8],
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.rtr
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc as usize
    }

    /// Payload bytes. Empty for remote frames, which carry a DLC but no data.
    fn data(&self) -> &[u8] {
        if self.rtr {
            &[]
        } else {
            &self.data[..self.dlc as usize]
        }
    }
}

impl CanFrame {
    /// Worst-case number of bits this frame occupies on the bus, including
    /// the maximum possible number of stuff bits for its frame class.
    pub fn on_wire_bits(&self) -> u32 {
        let n = 8 * self.dlc as u32;
        match (self.is_extended(), self.rtr) {
            // 44 framing bits, stuffing applies to the first 34 + data bits.
            (false, false) => n + 44 + (33 + n) / 4,
            // 64 framing bits, stuffing applies to the first 54 + data bits.
            (true, false) => n + 64 + (53 + n) / 4,
            (false, true) => 50,
            (true, true) => 73,
        }
    }
}

/// A received frame together with its acceptance metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxFrame {
    pub frame: CanFrame,
    /// Acceptance filter that matched the frame.
    pub filter_hit: FilterHit,
    /// Whether the frame rolled over from receive buffer 0 into buffer 1.
    pub rollover: bool,
}

/// Worst-case on-wire duration of `frame` at `speed`, in microseconds.
pub(crate) fn tx_wait_us(frame: &CanFrame, speed: CanSpeed) -> u32 {
    frame.on_wire_bits() * (1_000_000 / speed.bits_per_second())
}

#[cfg(test)]
mod tests {
    use embedded_hal::can::{ExtendedId, StandardId};

    use super::*;

    fn std_id(raw: u16) -> Id {
        Id::Standard(StandardId::new(raw).unwrap())
    }

    fn ext_id(raw: u32) -> Id {
        Id::Extended(ExtendedId::new(raw).unwrap())
    }

    #[test]
    fn standard_data_frame_bits() {
        let frame = CanFrame::new(std_id(0x123), &[1, 2]).unwrap();
        assert_eq!(frame.on_wire_bits(), 72);

        let frame = CanFrame::new(std_id(0x123), &[]).unwrap();
        assert_eq!(frame.on_wire_bits(), 52);
    }

    #[test]
    fn extended_data_frame_bits() {
        let frame = CanFrame::new(ext_id(0x12345), &[1, 2]).unwrap();
        assert_eq!(frame.on_wire_bits(), 97);
    }

    #[test]
    fn remote_frame_bits() {
        let frame = CanFrame::new_remote(std_id(0x123), 4).unwrap();
        assert_eq!(frame.on_wire_bits(), 50);

        let frame = CanFrame::new_remote(ext_id(0x12345), 4).unwrap();
        assert_eq!(frame.on_wire_bits(), 73);
    }

    #[test]
    fn remote_frame_has_no_data() {
        let frame = CanFrame::new_remote(std_id(0x123), 4).unwrap();
        assert_eq!(frame.dlc(), 4);
        assert!(frame.data().is_empty());
    }

    #[test]
    fn oversized_payload_rejected() {
        assert!(CanFrame::new(std_id(0x123), &[0; 9]).is_none());
        assert!(CanFrame::new_remote(std_id(0x123), 9).is_none());
    }

    #[test]
    fn wait_time_at_500kbps() {
        let frame = CanFrame::new(std_id(0x123), &[1, 2]).unwrap();
        assert_eq!(tx_wait_us(&frame, CanSpeed::Kbps500), 144);
    }
}
