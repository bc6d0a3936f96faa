use core::fmt::Debug;

use embedded_hal::can::Error as CanError;

pub type Result<T, SPIE, CSE> = core::result::Result<T, Error<SPIE, CSE>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error<SPIE, CSE> {
    /// MCP2515 did not respond to mode change.
    NewModeTimeout,
    /// Received an invalid frame ID.
    InvalidFrameId,
    /// Received an invalid DLC (CAN frame data length).
    InvalidDlc,
    /// SPI error.
    Spi(SPIE),
    /// Chip-select pin error.
    Pin(CSE),
}

impl<SPIE: Debug, CSE: Debug> CanError for Error<SPIE, CSE> {
    fn kind(&self) -> embedded_hal::can::ErrorKind {
        embedded_hal::can::ErrorKind::Other
    }
}
