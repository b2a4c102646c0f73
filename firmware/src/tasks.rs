//! タスクモジュール
//!
//! 各タスクの実装を分離して管理します。

pub mod led;
pub mod modbus;

// タスク関数を再エクスポート
pub use led::led_task;
pub use modbus::modbus_task;
