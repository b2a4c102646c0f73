//! Configuration module
//!
//! コンパイル時パラメータからアクチュエータ設定を組み立てます。
//! 位置は揮発性で、起動のたびにオーバードライブで取り直します。

pub mod params;

// params.rsから主要な定数を再エクスポート
pub use params::*;

use trv_actuator::ActuatorConfig;

/// デフォルトのアクチュエータ設定
///
/// 使用前に必ず `validate()` で検証すること。
pub const fn actuator_config() -> ActuatorConfig {
    ActuatorConfig {
        velocity: DEFAULT_VELOCITY,
        microsteps: DEFAULT_MICROSTEPS,
        total_steps: DEFAULT_TOTAL_STEPS,
        overdrive_steps: DEFAULT_OVERDRIVE_STEPS,
        init_overdrive_steps: DEFAULT_INIT_OVERDRIVE_STEPS,
        high_time_us: DEFAULT_HIGH_TIME_US,
        max_rel_position: DEFAULT_MAX_REL_POSITION,
        holding_time_ms: DEFAULT_HOLDING_TIME_MS,
    }
}
