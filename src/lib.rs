//! サーモスタットラジエーターバルブ用リニアアクチュエータ制御
//!
//! STEP/DIRドライバIC経由でステッピングモーターを駆動し、
//! フィールドバスのレジスタとして位置制御を公開します。
//!
//! | Module | Purpose |
//! | ------ | ------- |
//! | [`config`] | アクチュエータ設定と検証 |
//! | [`driver`] | 位置制御ドライバ（座標変換・パルス生成・オーバードライブ） |
//! | [`registers`] | レジスタマップとエラーコード |
//! | [`register_bridge`] | コマンドビット → ドライバ操作の変換 |
//! | [`modbus_protocol`] | Modbus RTUスレーブ |

#![cfg_attr(not(test), no_std)]

// fmt must come first so the logging macros are visible in every module
mod fmt;

pub mod config;
pub mod driver;
pub mod modbus_protocol;
pub mod register_bridge;
pub mod registers;

#[cfg(test)]
mod test_utils;

pub use config::{ActuatorConfig, ConfigError};
pub use driver::{
    ActuatorPins, ActuatorState, DriverError, Motion, OverdriveError, OverdrivePhase,
    PositionDriver,
};
pub use modbus_protocol::{ModbusSlave, Reply};
pub use register_bridge::{RegisterBridge, Transaction, ValveActuator};
pub use registers::{ErrorCode, RegisterBank, REGISTER_COUNT};
