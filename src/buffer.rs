//! Transmit and receive buffer identities and their register layouts.

use bitflags::bitflags;
use embedded_hal::can::{ExtendedId, Frame, Id, StandardId};
use modular_bitfield::prelude::*;

use crate::{frame::CanFrame, regs::Register};

/// One of the three transmit buffers.
///
/// Lower-numbered buffers win internal arbitration when several buffers are
/// pending at the same priority, so buffer number doubles as send priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxBuf {
    B0,
    B1,
    B2,
}

impl TxBuf {
    pub const ALL: [TxBuf; 3] = [TxBuf::B0, TxBuf::B1, TxBuf::B2];

    /// `TXBnCTRL` register of this buffer.
    pub fn ctrl(&self) -> Register {
        match self {
            TxBuf::B0 => Register::TXB0CTRL,
            TxBuf::B1 => Register::TXB1CTRL,
            TxBuf::B2 => Register::TXB2CTRL,
        }
    }

    /// First identifier register (`TXBnSIDH`) of this buffer.
    pub fn sidh(&self) -> Register {
        match self {
            TxBuf::B0 => Register::TXB0SIDH,
            TxBuf::B1 => Register::TXB1SIDH,
            TxBuf::B2 => Register::TXB2SIDH,
        }
    }

    /// First data register (`TXBnD0`) of this buffer.
    pub fn data(&self) -> Register {
        match self {
            TxBuf::B0 => Register::TXB0D0,
            TxBuf::B1 => Register::TXB1D0,
            TxBuf::B2 => Register::TXB2D0,
        }
    }
}

bitflags! {
    /// A selection of transmit buffers.
    pub struct TxBufSet: u8 {
        const B0 = 0b001;
        const B1 = 0b010;
        const B2 = 0b100;
    }
}

impl From<TxBuf> for TxBufSet {
    fn from(buf: TxBuf) -> Self {
        match buf {
            TxBuf::B0 => TxBufSet::B0,
            TxBuf::B1 => TxBufSet::B1,
            TxBuf::B2 => TxBufSet::B2,
        }
    }
}

/// One of the two receive buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxBuf {
    B0,
    B1,
}

impl RxBuf {
    pub const ALL: [RxBuf; 2] = [RxBuf::B0, RxBuf::B1];

    /// `RXBnCTRL` register of this buffer.
    pub fn ctrl(&self) -> Register {
        match self {
            RxBuf::B0 => Register::RXB0CTRL,
            RxBuf::B1 => Register::RXB1CTRL,
        }
    }

    /// First data register (`RXBnD0`) of this buffer.
    pub fn data(&self) -> Register {
        match self {
            RxBuf::B0 => Register::RXB0D0,
            RxBuf::B1 => Register::RXB1D0,
        }
    }
}

/// `TXBnSIDH..TXBnDLC` — the five identifier registers of a transmit buffer.
///
/// Byte order matches the chip: SIDH, SIDL, EID8, EID0, DLC. A standard
/// identifier leaves the extended bytes zeroed; `exide` selects the
/// identifier format the controller transmits.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxBufIdent {
    pub sid_high: B8,
    pub eid_high: B2,
    #[skip]
    __: B1,
    pub exide: bool,
    #[skip]
    __: B1,
    pub sid_low: B3,
    pub eid_mid: B8,
    pub eid_low: B8,
    pub dlc: B4,
    #[skip]
    __: B2,
    pub rtr: bool,
    #[skip]
    __: B1,
}

impl TxBufIdent {
    /// Packs a frame's identifier, DLC and remote flag into register form.
    pub fn from_frame(frame: &CanFrame) -> Self {
        let ident = match frame.id() {
            Id::Standard(id) => {
                let raw = id.as_raw();
                Self::new()
                    .with_sid_high((raw >> 3) as u8)
                    .with_sid_low((raw & 0x07) as u8)
            }
            Id::Extended(id) => {
                let raw = id.as_raw();
                Self::new()
                    .with_sid_high((raw >> 21) as u8)
                    .with_sid_low(((raw >> 18) & 0x07) as u8)
                    .with_exide(true)
                    .with_eid_high(((raw >> 16) & 0x03) as u8)
                    .with_eid_mid((raw >> 8) as u8)
                    .with_eid_low(raw as u8)
            }
        };
        ident
            .with_dlc(frame.dlc() as u8)
            .with_rtr(frame.is_remote_frame())
    }
}

/// `RXBnSIDH..RXBnDLC` — the five identifier registers of a receive buffer.
///
/// Same byte layout as [`TxBufIdent`]; in the SIDL byte the chip reports IDE
/// where a transmit buffer takes EXIDE, plus the SRR bit for standard frames.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RxBufIdent {
    pub sid_high: B8,
    pub eid_high: B2,
    #[skip]
    __: B1,
    pub ide: bool,
    pub srr: bool,
    pub sid_low: B3,
    pub eid_mid: B8,
    pub eid_low: B8,
    pub dlc: B4,
    #[skip]
    __: B2,
    pub rtr: bool,
    #[skip]
    __: B1,
}

impl RxBufIdent {
    /// Reconstructs the frame identifier, or `None` if the register bytes
    /// do not form a valid identifier.
    pub fn id(&self) -> Option<Id> {
        if self.ide() {
            let raw = (self.sid_high() as u32) << 21
                | (self.sid_low() as u32) << 18
                | (self.eid_high() as u32) << 16
                | (self.eid_mid() as u32) << 8
                | self.eid_low() as u32;
            ExtendedId::new(raw).map(Id::Extended)
        } else {
            let raw = (self.sid_high() as u16) << 3 | self.sid_low() as u16;
            StandardId::new(raw).map(Id::Standard)
        }
    }

    /// Whether the received frame is a remote frame. Standard frames signal
    /// this via SRR, extended frames via the RTR bit of the DLC register.
    pub fn is_remote(&self) -> bool {
        if self.ide() {
            self.rtr()
        } else {
            self.srr()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(id: Id) -> Id {
        let frame = CanFrame::new(id, &[]).unwrap();
        let bytes = TxBufIdent::from_frame(&frame).into_bytes();
        RxBufIdent::from_bytes(bytes).id().unwrap()
    }

    #[test]
    fn standard_id_round_trip() {
        for raw in [0x000, 0x001, 0x123, 0x555, 0x7FF] {
            let id = Id::Standard(StandardId::new(raw).unwrap());
            assert_eq!(round_trip(id), id);
        }
    }

    #[test]
    fn extended_id_round_trip() {
        for raw in [0x0000_0000, 0x0000_0001, 0x0001_2345, 0x1234_5678, 0x1FFF_FFFF] {
            let id = Id::Extended(ExtendedId::new(raw).unwrap());
            assert_eq!(round_trip(id), id);
        }
    }

    #[test]
    fn standard_id_packing() {
        let frame = CanFrame::new(Id::Standard(StandardId::new(0x123).unwrap()), &[1, 2]).unwrap();
        let bytes = TxBufIdent::from_frame(&frame).into_bytes();
        assert_eq!(bytes, [0x24, 0x60, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn extended_id_packing_sets_exide() {
        let frame =
            CanFrame::new(Id::Extended(ExtendedId::new(0x1FFF_FFFF).unwrap()), &[]).unwrap();
        let bytes = TxBufIdent::from_frame(&frame).into_bytes();
        assert_eq!(bytes, [0xFF, 0xEB, 0xFF, 0xFF, 0x00]);
    }

    #[test]
    fn remote_flag_in_dlc_byte() {
        let frame =
            CanFrame::new_remote(Id::Standard(StandardId::new(0x123).unwrap()), 4).unwrap();
        let bytes = TxBufIdent::from_frame(&frame).into_bytes();
        assert_eq!(bytes[4], 0x44);
    }

    #[test]
    fn remote_classification() {
        // Standard frame: SRR decides, DLC.RTR is ignored.
        let ident = RxBufIdent::from_bytes([0x24, 0x70, 0x00, 0x00, 0x04]);
        assert!(!ident.ide());
        assert!(ident.is_remote());

        // Extended frame: DLC.RTR decides.
        let ident = RxBufIdent::from_bytes([0x24, 0x68, 0x00, 0x00, 0x44]);
        assert!(ident.ide());
        assert!(ident.is_remote());
        let ident = RxBufIdent::from_bytes([0x24, 0x68, 0x00, 0x00, 0x04]);
        assert!(!ident.is_remote());
    }
}
