//! レジスタブリッジ
//!
//! フィールドバスのレジスタスナップショットを位置制御ドライバの操作に変換します。
//! ポーリング1回ごとにコマンドビットを確認し、ドライバを同期的に呼び出して
//! 結果を同じレジスタ配列に書き戻します。

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::driver::{DriverError, OverdriveError, PositionDriver};
use crate::fmt::*;
use crate::registers::{reg, ErrorCode, RegisterBank};

/// トランスポートが報告する1サイクル分の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transaction {
    /// リクエストを正常に処理した
    Ok,
    /// フレーム異常・例外応答など
    Error,
}

/// ブリッジから見たアクチュエータの公開契約
pub trait ValveActuator {
    fn overdrive(&mut self) -> Result<(), OverdriveError>;
    fn abort_overdrive(&mut self) -> Result<(), DriverError>;
    fn go_to_rel_position(&mut self, target: i32) -> Result<(), DriverError>;
    fn initial_overdrive(&mut self) -> Result<(), DriverError>;
    fn rel_position(&self) -> i32;
    fn is_ready(&self) -> bool;
}

impl<P, D> ValveActuator for PositionDriver<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    fn overdrive(&mut self) -> Result<(), OverdriveError> {
        PositionDriver::overdrive(self)
    }

    fn abort_overdrive(&mut self) -> Result<(), DriverError> {
        PositionDriver::abort_overdrive(self)
    }

    fn go_to_rel_position(&mut self, target: i32) -> Result<(), DriverError> {
        PositionDriver::go_to_rel_position(self, target)
    }

    fn initial_overdrive(&mut self) -> Result<(), DriverError> {
        PositionDriver::initial_overdrive(self)
    }

    fn rel_position(&self) -> i32 {
        PositionDriver::rel_position(self)
    }

    fn is_ready(&self) -> bool {
        PositionDriver::is_ready(self)
    }
}

/// レジスタブリッジ
pub struct RegisterBridge<A> {
    actuator: A,
}

impl<A: ValveActuator> RegisterBridge<A> {
    pub fn new(actuator: A) -> Self {
        Self { actuator }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// ポーリング1回分の処理
    ///
    /// トランザクションエラー時は何もしません。コマンドビットは
    /// OVERDRIVE → MOVE → FULL_OVERDRIVE の順に処理し、複数立っていれば
    /// 同じサイクルですべて実行します。失敗したコマンドのビットは残します
    /// （自動リトライはしない）。途中で失敗したオーバードライブは破棄し、
    /// コイル電源を切ります。
    pub fn poll(&mut self, regs: &mut RegisterBank, transaction: Transaction) {
        if transaction == Transaction::Error {
            debug!("Transaction error, skipping command processing");
            return;
        }

        if regs[reg::OVERDRIVE] != 0 {
            info!("Overdrive command");
            match self.actuator.overdrive() {
                Ok(()) => {
                    regs[reg::OVERDRIVE] = 0;
                    self.refresh_position(regs);
                }
                Err(e) => {
                    error!("Overdrive command failed: {:?}", e);
                    if self.actuator.abort_overdrive().is_err() {
                        error!("Failed to cut coil power after overdrive");
                    }
                    Self::fail(regs, ErrorCode::OverdriveFailed);
                }
            }
        }

        if regs[reg::MOVE] != 0 {
            let target = regs[reg::TARGET] as i32;
            info!("Move command: target={}", target);
            match self.actuator.go_to_rel_position(target) {
                Ok(()) => {
                    regs[reg::MOVE] = 0;
                    self.refresh_position(regs);
                }
                Err(e) => {
                    error!("Move command failed: {:?}", e);
                    Self::fail(regs, ErrorCode::MoveFailed);
                }
            }
        }

        if regs[reg::FULL_OVERDRIVE] != 0 {
            info!("Full overdrive command");
            match self.actuator.initial_overdrive() {
                Ok(()) => {
                    regs[reg::FULL_OVERDRIVE] = 0;
                    self.refresh_position(regs);
                    regs[reg::READY] = 1;
                    regs[reg::ERROR_CODE] = ErrorCode::None.into();
                }
                Err(e) => {
                    error!("Full overdrive command failed: {:?}", e);
                    Self::fail(regs, ErrorCode::FullOverdriveFailed);
                }
            }
        }
    }

    /// READY と POSITION をドライバの状態から書き込む
    pub fn publish_status(&self, regs: &mut RegisterBank) {
        regs[reg::READY] = self.actuator.is_ready() as u16;
        self.refresh_position(regs);
    }

    fn refresh_position(&self, regs: &mut RegisterBank) {
        regs[reg::POSITION] = position_register(self.actuator.rel_position());
    }

    fn fail(regs: &mut RegisterBank, code: ErrorCode) {
        regs[reg::ERROR_CODE] = code.into();
        regs[reg::READY] = 0;
    }
}

/// 設定不正を報告する（ドライバは生成されない）
pub fn report_config_invalid(regs: &mut RegisterBank) {
    regs[reg::ERROR_CODE] = ErrorCode::ConfigInvalid.into();
    regs[reg::READY] = 0;
}

fn position_register(rel_position: i32) -> u16 {
    rel_position.clamp(0, u16::MAX as i32) as u16
}
