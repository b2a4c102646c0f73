//! ハードウェア初期化モジュール
//!
//! クロックと割り込みの設定を集約します。
//!
//! ピン割り当て:
//! - PB0 = ENABLE、PB1 = STEP、PB2 = DIR（ドライバIC）
//! - PC14 = BUSY表示、PC13 = ステータスLED
//! - PA2 = USART2_TX、PA3 = USART2_RX、PA1 = USART2_DE（RS-485トランシーバ）
//!
//! 送信方向の切り替えはUSARTのハードウェアDE出力で行います。
//! STEPパルスは `embassy_time::Delay` で刻むため、タイマーは1MHzティックで動かします。

use embassy_stm32::{bind_interrupts, peripherals, usart, Config};

// USARTの割り込みをバインド
bind_interrupts!(pub struct Irqs {
    USART2 => usart::InterruptHandler<peripherals::USART2>;
});

/// RCCクロック設定を初期化
///
/// HSI → PLL（÷4 × 85 ÷ 2）で170MHz生成
pub fn create_clock_config() -> Config {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::{Pll, PllMul, PllPreDiv, PllRDiv, PllSource, Sysclk};

        config.rcc.hsi = true;
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL85,
            divp: None,
            divq: None,
            divr: Some(PllRDiv::DIV2),
        });
        config.rcc.sys = Sysclk::PLL1_R; // システムクロックをPLLに設定
    }
    config
}

/// Modbus用UART設定
pub fn create_uart_config(baudrate: u32) -> usart::Config {
    let mut config = usart::Config::default();
    config.baudrate = baudrate;
    config
}
