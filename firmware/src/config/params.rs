//! アクチュエータとハードウェアの設定パラメータ
//!
//! 正方向 = 開方向。閉方向の回転向きはドライバ側の配線で必ず確認すること。

/// 速度 [フルステップ/秒]（デフォルト値）
pub const DEFAULT_VELOCITY: i32 = 100;

/// ドライバICに設定したマイクロステップ分割数（デフォルト値）
pub const DEFAULT_MICROSTEPS: i32 = 128;

/// 全ストロークのフルステップ数（マイクロステップを含まない）（デフォルト値）
pub const DEFAULT_TOTAL_STEPS: i32 = 600;

/// 定期オーバードライブで端点を越えて押し込むフルステップ数（全ストロークの5%）（デフォルト値）
pub const DEFAULT_OVERDRIVE_STEPS: i32 = 30;

/// 起動時オーバードライブの余裕分フルステップ数（位置不明のため大きめ）（デフォルト値）
pub const DEFAULT_INIT_OVERDRIVE_STEPS: i32 = 60;

/// STEPパルスのHIGH時間 [us]（デフォルト値）
pub const DEFAULT_HIGH_TIME_US: i32 = 5;

/// 相対位置スケール上限（0 = 全閉、1000 = 全開）（デフォルト値）
pub const DEFAULT_MAX_REL_POSITION: i32 = 1000;

/// 移動後にコイル電源を切るまでの保持時間 [ms]（デフォルト値）
pub const DEFAULT_HOLDING_TIME_MS: i32 = 200;

/// 起動直後に初回オーバードライブを実行する
pub const CALIBRATE_ON_STARTUP: bool = true;

/// Modbus RTU設定
pub mod modbus {
    /// スレーブアドレス（デフォルト値）
    pub const DEFAULT_SLAVE_ADDRESS: u8 = 1;

    /// ボーレート（9600bps, 8N1）（デフォルト値）
    pub const DEFAULT_BAUDRATE: u32 = 9600;
}

/// ステータスLED
pub mod led {
    /// 準備完了時の点滅周期の半分 [ms]
    pub const READY_BLINK_MS: u64 = 500;

    /// エラー時の点滅周期の半分 [ms]
    pub const FAULT_BLINK_MS: u64 = 100;

    /// 状態確認周期 [ms]
    pub const POLL_MS: u64 = 200;
}
