//! Transmit status decode.

use crate::regs::TxbCtrl;

/// Outcome of a transmission attempt, decoded from `TXBnCTRL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Transmission is still pending.
    Pending,
    /// The message lost bus arbitration.
    LostArbitration,
    /// A bus error occurred during transmission.
    BusError,
    /// A bus error occurred and the message also lost arbitration.
    BusErrorAndLostArbitration,
    /// The transmission was aborted.
    Aborted,
    /// The message was transmitted successfully.
    Success,
}

impl TxStatus {
    /// Decodes a transmit buffer's control register.
    ///
    /// While TXREQ is set (and the abort flag is not), the error flags
    /// describe the in-flight attempt; once TXREQ clears, ABTF distinguishes
    /// an aborted message from a successful one.
    pub fn from_ctrl(ctrl: TxbCtrl) -> Self {
        if ctrl.txreq() && !ctrl.abtf() {
            match (ctrl.txerr(), ctrl.mloa()) {
                (true, true) => TxStatus::BusErrorAndLostArbitration,
                (true, false) => TxStatus::BusError,
                (false, true) => TxStatus::LostArbitration,
                (false, false) => TxStatus::Pending,
            }
        } else if ctrl.abtf() {
            TxStatus::Aborted
        } else {
            TxStatus::Success
        }
    }
}
