//! Register map exposed on the fieldbus
//!
//! One 16-bit holding register per field. Indices and error codes are part
//! of the wire contract.

/// Register indices
pub mod reg {
    /// 1 = calibrated, commands accepted (read only)
    pub const READY: usize = 0;

    /// 1 = request an overdrive with return to the current position
    pub const OVERDRIVE: usize = 1;

    /// 1 = request a move to [`TARGET`]
    pub const MOVE: usize = 2;

    /// 1 = request a full (initial) overdrive
    pub const FULL_OVERDRIVE: usize = 3;

    /// Last known relative position (read only)
    pub const POSITION: usize = 4;

    /// Last error code, see [`super::ErrorCode`] (read only)
    pub const ERROR_CODE: usize = 5;

    /// Target relative position for the move command
    pub const TARGET: usize = 6;
}

/// Number of registers in the bank
pub const REGISTER_COUNT: usize = 7;

/// Register snapshot shared between the transport and the bridge
pub type RegisterBank = [u16; REGISTER_COUNT];

/// Error codes published in [`reg::ERROR_CODE`]
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    None = 0,
    ConfigInvalid = 1,
    OverdriveFailed = 2,
    MoveFailed = 3,
    FullOverdriveFailed = 4,
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Whether a master may write the register at `index`
pub fn is_writable(index: usize) -> bool {
    matches!(
        index,
        reg::OVERDRIVE | reg::MOVE | reg::FULL_OVERDRIVE | reg::TARGET
    )
}

/// Fresh bank: not ready, no error, no pending commands
pub const fn new_bank() -> RegisterBank {
    [0; REGISTER_COUNT]
}
