//! オーバードライブ（ゼロ点キャリブレーション）
//!
//! 全閉側の機械的端点を越えて意図的に押し込み、ゼロ点を物理的に確定させます。
//! - 初回オーバードライブ: 位置不明の起動直後に、全ストローク＋余裕分だけ閉方向へ駆動
//! - オーバードライブ: 現在位置を信頼して端点へ押し込み、元の相対位置へ戻る

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::{DriverError, PositionDriver};
use crate::fmt::*;

/// オーバードライブの進行フェーズ
///
/// 失敗した場合は失敗したフェーズのまま残り、中断されたキャリブレーションを検出できます。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverdrivePhase {
    /// 未実行
    Idle,
    /// 端点へ押し込み中
    SeatAtZero,
    /// 元の位置へ復帰中
    ReturnToTarget,
    /// 完了
    Done,
}

/// オーバードライブの失敗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OverdriveError {
    /// 失敗したフェーズ
    pub phase: OverdrivePhase,
    /// 原因
    pub cause: DriverError,
}

impl<P, D> PositionDriver<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    pub fn overdrive_phase(&self) -> OverdrivePhase {
        self.state.overdrive_phase
    }

    /// 初回オーバードライブ
    ///
    /// 現在位置を一切仮定せず、`(total_steps + init_overdrive_steps) * microsteps`
    /// だけ閉方向へ駆動します。成功時は位置0・電源OFF・ready で、
    /// 中断されたオーバードライブのフェーズも破棄します。
    /// 失敗時は電源を切り、位置とreadyは変更しません。
    pub fn initial_overdrive(&mut self) -> Result<(), DriverError> {
        if !self.state.enabled {
            self.enable()?;
        }

        let steps = -((self.config.total_steps as i64 + self.config.init_overdrive_steps as i64)
            * self.config.microsteps as i64);
        info!("Initial overdrive: {} steps", steps);

        if let Err(e) = self.make_steps(steps) {
            error!("Initial overdrive failed: {:?}", e);
            self.cut_power();
            return Err(e);
        }

        self.state.current_abs_position = 0;
        self.hold();
        self.disable()?;
        self.state.ready = true;
        self.state.overdrive_phase = OverdrivePhase::Idle;
        info!("Initial overdrive completed, zero reference established");
        Ok(())
    }

    /// オーバードライブ
    ///
    /// 端点を越えて `overdrive_steps` だけ押し込んでゼロ点を取り直し、
    /// 直前の相対位置へ戻ります。戻り位置は相対位置から再計算します（積算しない）。
    ///
    /// 途中で失敗した場合はロールバックしません。電源が入ったまま途中位置に
    /// 残る可能性があり、`overdrive_phase()` は失敗したフェーズを示します。
    pub fn overdrive(&mut self) -> Result<(), OverdriveError> {
        if !matches!(
            self.state.overdrive_phase,
            OverdrivePhase::Idle | OverdrivePhase::Done
        ) {
            warn!(
                "Previous overdrive interrupted in {:?}, starting over",
                self.state.overdrive_phase
            );
        }

        let old_position = self.rel_position();
        info!("Overdrive from rel={}", old_position);

        self.state.overdrive_phase = OverdrivePhase::SeatAtZero;
        self.seat_at_zero().map_err(|cause| self.overdrive_failed(cause))?;

        self.state.overdrive_phase = OverdrivePhase::ReturnToTarget;
        self.return_to(old_position)
            .map_err(|cause| self.overdrive_failed(cause))?;

        self.disable().map_err(|cause| self.overdrive_failed(cause))?;
        self.state.overdrive_phase = OverdrivePhase::Done;
        info!("Overdrive completed, back at rel={}", self.rel_position());
        Ok(())
    }

    /// 中断されたオーバードライブを破棄して電源を切る
    ///
    /// 位置は補正しません。正しいゼロ点が必要なら改めてオーバードライブを実行します。
    pub fn abort_overdrive(&mut self) -> Result<(), DriverError> {
        self.disable()?;
        self.state.overdrive_phase = OverdrivePhase::Idle;
        Ok(())
    }

    fn seat_at_zero(&mut self) -> Result<(), DriverError> {
        if !self.state.enabled {
            self.enable()?;
        }
        // overdrive_steps はフルステップ単位、パルスはマイクロステップ単位
        let overshoot = self.config.overdrive_steps as i64 * self.config.microsteps as i64;
        let steps = self.calc_steps_to_rel_position(0)? - overshoot;
        self.make_steps(steps)?;
        self.hold();
        self.state.current_abs_position = 0;
        Ok(())
    }

    fn return_to(&mut self, rel_position: i32) -> Result<(), DriverError> {
        let steps = self.calc_steps_to_rel_position(rel_position)?;
        self.make_steps(steps)?;
        self.hold();
        self.state.current_abs_position = self.convert_rel_position_to_abs(rel_position)?;
        Ok(())
    }

    fn overdrive_failed(&self, cause: DriverError) -> OverdriveError {
        let phase = self.state.overdrive_phase;
        error!("Overdrive failed in {:?}: {:?}", phase, cause);
        OverdriveError { phase, cause }
    }
}
