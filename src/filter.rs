//! Acceptance mask and filter identities and their register layouts.

use embedded_hal::can::Id;
use modular_bitfield::prelude::*;

use crate::regs::Register;

/// One of the two acceptance masks. Mask 0 applies to receive buffer 0
/// (filters 0-1), mask 1 to receive buffer 1 (filters 2-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxMask {
    Mask0,
    Mask1,
}

impl RxMask {
    pub const ALL: [RxMask; 2] = [RxMask::Mask0, RxMask::Mask1];

    /// First register (`RXMnSIDH`) of this mask's four-byte group.
    pub fn sidh(&self) -> Register {
        match self {
            RxMask::Mask0 => Register::RXM0SIDH,
            RxMask::Mask1 => Register::RXM1SIDH,
        }
    }
}

/// One of the six acceptance filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxFilter {
    F0,
    F1,
    F2,
    F3,
    F4,
    F5,
}

impl RxFilter {
    pub const ALL: [RxFilter; 6] = [
        RxFilter::F0,
        RxFilter::F1,
        RxFilter::F2,
        RxFilter::F3,
        RxFilter::F4,
        RxFilter::F5,
    ];

    /// First register (`RXFnSIDH`) of this filter's four-byte group.
    pub fn sidh(&self) -> Register {
        match self {
            RxFilter::F0 => Register::RXF0SIDH,
            RxFilter::F1 => Register::RXF1SIDH,
            RxFilter::F2 => Register::RXF2SIDH,
            RxFilter::F3 => Register::RXF3SIDH,
            RxFilter::F4 => Register::RXF4SIDH,
            RxFilter::F5 => Register::RXF5SIDH,
        }
    }
}

/// `RXFnSIDH..RXFnEID0` — the four registers of an acceptance filter.
///
/// An extended identifier sets EXIDE, restricting the filter to extended
/// frames; a standard identifier leaves the extended bytes zeroed.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RxFilterReg {
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
}

impl RxFilterReg {
    pub fn from_id(id: Id) -> Self {
        match id {
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
        }
    }
}

/// `RXMnSIDH..RXMnEID0` — the four registers of an acceptance mask.
///
/// Same layout as [`RxFilterReg`] minus EXIDE, which masks have no use for.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RxMaskReg {
    pub sid_high: B8,
    pub eid_high: B2,
    #[skip]
    __: B3,
    pub sid_low: B3,
    pub eid_mid: B8,
    pub eid_low: B8,
}

impl RxMaskReg {
    pub fn from_id(id: Id) -> Self {
        match id {
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
                    .with_eid_high(((raw >> 16) & 0x03) as u8)
                    .with_eid_mid((raw >> 8) as u8)
                    .with_eid_low(raw as u8)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::can::{ExtendedId, StandardId};

    use super::*;

    #[test]
    fn standard_filter_packing() {
        let reg = RxFilterReg::from_id(Id::Standard(StandardId::new(0x555).unwrap()));
        assert_eq!(reg.into_bytes(), [0xAA, 0xA0, 0x00, 0x00]);
    }

    #[test]
    fn extended_filter_sets_exide() {
        let reg = RxFilterReg::from_id(Id::Extended(ExtendedId::new(0x1234_5678).unwrap()));
        assert_eq!(reg.into_bytes(), [0x91, 0xA8, 0x56, 0x78]);
    }

    #[test]
    fn standard_mask_packing() {
        let reg = RxMaskReg::from_id(Id::Standard(StandardId::new(0x7FF).unwrap()));
        assert_eq!(reg.into_bytes(), [0xFF, 0xE0, 0x00, 0x00]);
    }

    #[test]
    fn extended_mask_has_no_exide() {
        let reg = RxMaskReg::from_id(Id::Extended(ExtendedId::new(0x1FFF_FFFF).unwrap()));
        assert_eq!(reg.into_bytes(), [0xFF, 0xE3, 0xFF, 0xFF]);
    }
}
