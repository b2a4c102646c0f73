//! ステータスLEDタスク
//!
//! アクチュエータの状態をLEDの点灯パターンで表示します。
//! - 準備完了: ゆっくり点滅
//! - エラーあり: 速く点滅
//! - 未キャリブレーション: 常時点灯

use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Timer};

use crate::fmt::*;
use crate::config::led::{FAULT_BLINK_MS, POLL_MS, READY_BLINK_MS};
use crate::state::ACTUATOR_STATUS;

/// ステータスLEDタスク
#[embassy_executor::task]
pub async fn led_task(mut led: Output<'static>) {
    info!("LED task started");

    loop {
        let status = *ACTUATOR_STATUS.lock().await;

        if status.has_error() {
            blink(&mut led, FAULT_BLINK_MS).await;
        } else if status.ready {
            blink(&mut led, READY_BLINK_MS).await;
        } else {
            led.set_high();
            Timer::after(Duration::from_millis(POLL_MS)).await;
        }
    }
}

async fn blink(led: &mut Output<'static>, half_period_ms: u64) {
    led.set_high();
    Timer::after(Duration::from_millis(half_period_ms)).await;
    led.set_low();
    Timer::after(Duration::from_millis(half_period_ms)).await;
}
