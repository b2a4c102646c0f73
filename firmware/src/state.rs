//! グローバル共有状態管理
//!
//! アクチュエータ本体とレジスタバンクはModbusタスクが単独で所有します。
//! ここではLEDタスクと共有する状態表示だけをMutexで保護します。

use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::mutex::Mutex;

use trv_actuator::registers::{reg, ErrorCode, RegisterBank};

/// アクチュエータ状態のスナップショット（LED表示用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub ready: bool,
    pub error_code: u16,
}

impl StatusSnapshot {
    pub const fn new() -> Self {
        Self {
            ready: false,
            error_code: ErrorCode::None as u16,
        }
    }

    pub fn from_registers(regs: &RegisterBank) -> Self {
        Self {
            ready: regs[reg::READY] != 0,
            error_code: regs[reg::ERROR_CODE],
        }
    }

    pub fn has_error(&self) -> bool {
        self.error_code != ErrorCode::None as u16
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// アクチュエータ状態（LED表示用）
pub static ACTUATOR_STATUS: Mutex<ThreadModeRawMutex, StatusSnapshot> =
    Mutex::new(StatusSnapshot::new());

/// レジスタの内容を状態表示に反映
pub async fn publish(regs: &RegisterBank) {
    *ACTUATOR_STATUS.lock().await = StatusSnapshot::from_registers(regs);
}
