//! 位置制御ドライバ
//!
//! STEP/DIRドライバICを介してステッピングモーターを駆動し、
//! ステップ数の積算でバルブ位置を管理します（エンコーダなし）。
//!
//! 位置は2種類の座標で扱います。
//! - 絶対位置: 全閉端からのマイクロステップ数
//! - 相対位置: 外部に公開する 0～max_rel_position のスケール
//!
//! 正方向 = 開方向、負方向 = 閉方向（全閉端 = 0）。

pub mod calibration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{ActuatorConfig, ConfigError};
use crate::fmt::*;

pub use calibration::{OverdriveError, OverdrivePhase};

/// ドライバICへの4本の出力ライン
pub struct ActuatorPins<P> {
    /// コイル電源（HIGH = 通電）
    pub enable: P,
    /// STEPパルス
    pub step: P,
    /// 回転方向（HIGH = 閉方向）
    pub direction: P,
    /// 動作中表示
    pub busy: P,
}

/// モーション状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Motion {
    /// 停止中
    Idle,
    /// パルス列出力中
    Moving {
        /// 残りパルス数
        remaining_steps: u64,
    },
}

impl Motion {
    pub fn is_moving(&self) -> bool {
        matches!(self, Motion::Moving { .. })
    }
}

/// ドライバ操作のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// パルス列出力中
    Busy,
    /// コイル電源が入っていない
    Disabled,
    /// 相対位置が 0～max_rel_position の範囲外
    PositionOutOfRange { requested: i32, max: i32 },
    /// 出力ピンの書き込み失敗
    Pin,
}

/// アクチュエータの可変状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorState {
    /// 全閉端からの絶対位置 [マイクロステップ]
    pub current_abs_position: i64,
    /// コイル通電中
    pub enabled: bool,
    /// モーション状態
    pub motion: Motion,
    /// 初回キャリブレーション完了（ゼロ点が信頼できる）
    pub ready: bool,
    /// STEPパルス間の待ち時間 [us]
    pub step_timeout_us: u32,
    /// オーバードライブの進行フェーズ
    pub overdrive_phase: OverdrivePhase,
}

impl ActuatorState {
    fn reset(step_timeout_us: u32) -> Self {
        Self {
            current_abs_position: 0,
            enabled: false,
            motion: Motion::Idle,
            ready: false,
            step_timeout_us,
            overdrive_phase: OverdrivePhase::Idle,
        }
    }
}

/// 位置制御ドライバ
pub struct PositionDriver<P, D> {
    config: ActuatorConfig,
    pins: ActuatorPins<P>,
    delay: D,
    state: ActuatorState,
}

impl<P, D> PositionDriver<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    /// 設定を検証してドライバを作成
    ///
    /// # 戻り値
    /// * `Err(ConfigError)` - 設定が不正（ハードウェアには一切触れない）
    pub fn new(
        config: ActuatorConfig,
        pins: ActuatorPins<P>,
        delay: D,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut driver = Self {
            config,
            pins,
            delay,
            state: ActuatorState::reset(config.step_timeout_us()),
        };
        driver.init(config)?;
        Ok(driver)
    }

    /// 再初期化
    ///
    /// 位置を0と宣言し直すだけで、物理的には動かしません。
    /// 不正な設定の場合は何も変更しません。
    pub fn init(&mut self, config: ActuatorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.state = ActuatorState::reset(config.step_timeout_us());

        for pin in [
            &mut self.pins.enable,
            &mut self.pins.step,
            &mut self.pins.direction,
            &mut self.pins.busy,
        ] {
            if pin.set_low().is_err() {
                warn!("Output pin could not be driven low during init");
            }
        }

        info!(
            "Driver initialized: travel={} usteps, step_timeout={}us",
            self.config.travel_microsteps(),
            self.state.step_timeout_us
        );
        Ok(())
    }

    pub fn config(&self) -> &ActuatorConfig {
        &self.config
    }

    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    pub fn current_abs_position(&self) -> i64 {
        self.state.current_abs_position
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn is_busy(&self) -> bool {
        self.state.motion.is_moving()
    }

    pub fn motion(&self) -> Motion {
        self.state.motion
    }

    pub fn is_ready(&self) -> bool {
        self.state.ready
    }

    pub fn step_timeout_us(&self) -> u32 {
        self.state.step_timeout_us
    }

    /// コイル通電
    pub fn enable(&mut self) -> Result<(), DriverError> {
        self.pins.enable.set_high().map_err(|_| DriverError::Pin)?;
        self.state.enabled = true;
        Ok(())
    }

    /// コイル通電停止
    pub fn disable(&mut self) -> Result<(), DriverError> {
        self.pins.enable.set_low().map_err(|_| DriverError::Pin)?;
        self.state.enabled = false;
        Ok(())
    }

    /// 現在の相対位置（切り捨て）
    pub fn rel_position(&self) -> i32 {
        let scaled = self.state.current_abs_position * self.config.max_rel_position as i64;
        (scaled / self.config.travel_microsteps()) as i32
    }

    /// 相対位置を絶対位置に変換（切り捨て）
    pub fn convert_rel_position_to_abs(&self, rel_position: i32) -> Result<i64, DriverError> {
        let max = self.config.max_rel_position;
        if rel_position < 0 || rel_position > max {
            return Err(DriverError::PositionOutOfRange {
                requested: rel_position,
                max,
            });
        }
        Ok(rel_position as i64 * self.config.travel_microsteps() / max as i64)
    }

    /// 目標相対位置までのステップ数（負 = 閉方向）
    pub fn calc_steps_to_rel_position(&self, target: i32) -> Result<i64, DriverError> {
        let target_abs = self.convert_rel_position_to_abs(target)?;
        Ok(target_abs - self.state.current_abs_position)
    }

    /// パルス列を出力
    ///
    /// 出力が終わるまで戻りません。位置の更新は呼び出し側で行います。
    ///
    /// # 戻り値
    /// * `Err(Busy)` / `Err(Disabled)` - 何もせずに失敗
    /// * `Err(Pin)` - 出力途中でピン書き込みに失敗
    pub fn make_steps(&mut self, steps: i64) -> Result<(), DriverError> {
        if self.state.motion.is_moving() {
            return Err(DriverError::Busy);
        }
        if !self.state.enabled {
            return Err(DriverError::Disabled);
        }

        let closing = steps < 0;
        let count = steps.unsigned_abs();
        debug!("make_steps: {} steps (closing={})", count, closing);

        self.set_busy(count)?;
        let train = self.pulse_train(closing, count);
        let released = if closing {
            self.pins.direction.set_low().map_err(|_| DriverError::Pin)
        } else {
            Ok(())
        };
        let idle = self.set_not_busy();

        train.and(released).and(idle)
    }

    /// 目標相対位置へ移動
    ///
    /// 範囲外の目標では状態（通電を含む）を一切変更しません。
    pub fn go_to_rel_position(&mut self, target: i32) -> Result<(), DriverError> {
        let steps = self.calc_steps_to_rel_position(target)?;
        if !self.state.enabled {
            self.enable()?;
        }

        if let Err(e) = self.make_steps(steps) {
            error!("Move to {} failed: {:?}", target, e);
            self.cut_power();
            return Err(e);
        }

        self.state.current_abs_position += steps;
        self.hold();
        self.disable()?;
        info!(
            "Moved to rel={} (abs={})",
            target, self.state.current_abs_position
        );
        Ok(())
    }

    fn set_busy(&mut self, count: u64) -> Result<(), DriverError> {
        self.pins.busy.set_high().map_err(|_| DriverError::Pin)?;
        self.state.motion = Motion::Moving {
            remaining_steps: count,
        };
        Ok(())
    }

    fn set_not_busy(&mut self) -> Result<(), DriverError> {
        self.state.motion = Motion::Idle;
        self.pins.busy.set_low().map_err(|_| DriverError::Pin)
    }

    fn pulse_train(&mut self, closing: bool, count: u64) -> Result<(), DriverError> {
        if closing {
            self.pins.direction.set_high().map_err(|_| DriverError::Pin)?;
        }

        let high_time = self.config.high_time_us as u32;
        let step_timeout = self.state.step_timeout_us;
        for sent in 1..=count {
            self.pins.step.set_high().map_err(|_| DriverError::Pin)?;
            self.delay.delay_us(high_time);
            self.pins.step.set_low().map_err(|_| DriverError::Pin)?;
            self.delay.delay_us(step_timeout);
            self.state.motion = Motion::Moving {
                remaining_steps: count - sent,
            };
        }
        Ok(())
    }

    /// 保持時間待ち
    fn hold(&mut self) {
        self.delay.delay_ms(self.config.holding_time_ms as u32);
    }

    /// 失敗経路での電源遮断（失敗しても元のエラーを優先）
    fn cut_power(&mut self) {
        if self.disable().is_err() {
            error!("Failed to cut coil power");
        }
    }
}
