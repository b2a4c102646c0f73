//! アクチュエータ設定
//!
//! 起動時に一度だけ検証され、以降は変更されない設定値を定義します。

/// ステップ間隔の下限 [us]
pub const MIN_STEP_TIMEOUT_US: u32 = 10;

/// 相対位置スケール上限の最小値
pub const MIN_MAX_REL_POSITION: i32 = 10;

/// 設定値の検証エラー
///
/// 最初に見つかった範囲外のフィールドを示します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// velocity < 1
    Velocity,
    /// microsteps < 1
    Microsteps,
    /// total_steps < 1
    TotalSteps,
    /// overdrive_steps < 1
    OverdriveSteps,
    /// init_overdrive_steps < 1
    InitOverdriveSteps,
    /// high_time_us < 1
    HighTime,
    /// max_rel_position < 10
    MaxRelPosition,
    /// holding_time_ms < 0
    HoldingTime,
}

/// アクチュエータ設定
///
/// ステップ数はすべてフルステップ単位。内部では `microsteps` を掛けた
/// マイクロステップ単位で位置を管理します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorConfig {
    /// 目標速度 [フルステップ/秒]
    pub velocity: i32,
    /// ドライバICに設定されたマイクロステップ分割数
    pub microsteps: i32,
    /// 全ストロークのフルステップ数
    pub total_steps: i32,
    /// 再キャリブレーション時に端点を越えて押し込むフルステップ数
    pub overdrive_steps: i32,
    /// 初回キャリブレーション時に押し込むフルステップ数（位置不明のため大きめ）
    pub init_overdrive_steps: i32,
    /// STEPパルスのHIGH時間 [us]
    pub high_time_us: i32,
    /// 相対位置スケールの上限（0 = 全閉、max = 全開）
    pub max_rel_position: i32,
    /// 最終ステップからコイル電源を切るまでの保持時間 [ms]
    pub holding_time_ms: i32,
}

impl ActuatorConfig {
    /// 設定値を検証
    ///
    /// # 戻り値
    /// * `Ok(())` - すべてのフィールドが範囲内
    /// * `Err(ConfigError)` - 最初に見つかった範囲外のフィールド
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.velocity < 1 {
            return Err(ConfigError::Velocity);
        }
        if self.microsteps < 1 {
            return Err(ConfigError::Microsteps);
        }
        if self.total_steps < 1 {
            return Err(ConfigError::TotalSteps);
        }
        if self.overdrive_steps < 1 {
            return Err(ConfigError::OverdriveSteps);
        }
        if self.init_overdrive_steps < 1 {
            return Err(ConfigError::InitOverdriveSteps);
        }
        if self.high_time_us < 1 {
            return Err(ConfigError::HighTime);
        }
        if self.max_rel_position < MIN_MAX_REL_POSITION {
            return Err(ConfigError::MaxRelPosition);
        }
        if self.holding_time_ms < 0 {
            return Err(ConfigError::HoldingTime);
        }
        Ok(())
    }

    /// 副作用のない検証述語
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// 全ストロークのマイクロステップ数
    pub fn travel_microsteps(&self) -> i64 {
        self.total_steps as i64 * self.microsteps as i64
    }

    /// STEPパルス間の待ち時間 [us]
    ///
    /// `1_000_000 / (velocity * microsteps) - high_time` を計算し、
    /// 10us未満にはしません。
    pub fn step_timeout_us(&self) -> u32 {
        let rate = (self.velocity as i64 * self.microsteps as i64).max(1);
        let timeout = 1_000_000 / rate - self.high_time_us as i64;
        timeout.max(MIN_STEP_TIMEOUT_US as i64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ActuatorConfig {
        ActuatorConfig {
            velocity: 100,
            microsteps: 32,
            total_steps: 600,
            overdrive_steps: 20,
            init_overdrive_steps: 60,
            high_time_us: 5,
            max_rel_position: 1000,
            holding_time_ms: 100,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(base().validate(), Ok(()));
        assert!(base().is_valid());
    }

    #[test]
    fn test_each_bound_is_reported() {
        let cases = [
            (ActuatorConfig { velocity: 0, ..base() }, ConfigError::Velocity),
            (ActuatorConfig { microsteps: 0, ..base() }, ConfigError::Microsteps),
            (ActuatorConfig { total_steps: 0, ..base() }, ConfigError::TotalSteps),
            (ActuatorConfig { overdrive_steps: 0, ..base() }, ConfigError::OverdriveSteps),
            (
                ActuatorConfig { init_overdrive_steps: -1, ..base() },
                ConfigError::InitOverdriveSteps,
            ),
            (ActuatorConfig { high_time_us: 0, ..base() }, ConfigError::HighTime),
            (ActuatorConfig { max_rel_position: 9, ..base() }, ConfigError::MaxRelPosition),
            (ActuatorConfig { holding_time_ms: -1, ..base() }, ConfigError::HoldingTime),
        ];
        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
            assert!(!config.is_valid());
        }
    }

    #[test]
    fn test_boundary_values_are_accepted() {
        let config = ActuatorConfig {
            velocity: 1,
            microsteps: 1,
            total_steps: 1,
            overdrive_steps: 1,
            init_overdrive_steps: 1,
            high_time_us: 1,
            max_rel_position: 10,
            holding_time_ms: 0,
        };
        assert!(config.is_valid());
    }

    #[test]
    fn test_step_timeout() {
        // 1_000_000 / (100 * 32) = 312 -> 312 - 5 = 307
        assert_eq!(base().step_timeout_us(), 307);

        // 1_000_000 / (100 * 128) = 78 -> 78 - 5 = 73
        let config = ActuatorConfig { microsteps: 128, ..base() };
        assert_eq!(config.step_timeout_us(), 73);
    }

    #[test]
    fn test_step_timeout_floor() {
        // 1_000_000 / (1000 * 256) = 3 -> 3 - 5 < 10
        let fast = ActuatorConfig { velocity: 1000, microsteps: 256, ..base() };
        assert_eq!(fast.step_timeout_us(), MIN_STEP_TIMEOUT_US);

        let long_pulse = ActuatorConfig { high_time_us: 1_000_000, ..base() };
        assert_eq!(long_pulse.step_timeout_us(), MIN_STEP_TIMEOUT_US);

        for velocity in [1, 7, 100, 5000] {
            for microsteps in [1, 16, 128, 256] {
                for high_time_us in [1, 5, 500] {
                    let config = ActuatorConfig {
                        velocity,
                        microsteps,
                        high_time_us,
                        ..base()
                    };
                    assert!(config.step_timeout_us() >= MIN_STEP_TIMEOUT_US);
                }
            }
        }
    }

    #[test]
    fn test_travel_microsteps() {
        assert_eq!(base().travel_microsteps(), 19_200);
    }
}
