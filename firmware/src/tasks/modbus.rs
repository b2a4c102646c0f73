//! Modbus通信タスク
//!
//! RS-485経由でリクエストを受信してレジスタバンクに反映し、
//! 応答送信後にレジスタブリッジでコマンドビットを処理します。

use embassy_stm32::{gpio::Output, mode::Async, usart::Uart};
use embassy_time::Delay;

use trv_actuator::modbus_protocol::MAX_FRAME_LEN;
use trv_actuator::registers::reg;
use trv_actuator::{ModbusSlave, PositionDriver, RegisterBank, RegisterBridge, Transaction};

use crate::config::modbus::DEFAULT_SLAVE_ADDRESS;
use crate::fmt::*;
use crate::state;

/// ボード上のアクチュエータ
pub type Actuator = PositionDriver<Output<'static>, Delay>;

/// Modbus通信タスク - リクエスト処理とコマンド実行
///
/// アクチュエータとレジスタバンクはこのタスクが単独で所有するため、
/// ドライバ操作が他の処理と交錯することはありません。
/// 移動中（パルス出力中）は次のフレームを受信しません。
#[embassy_executor::task]
pub async fn modbus_task(
    mut uart: Uart<'static, Async>,
    mut bridge: RegisterBridge<Actuator>,
    mut regs: RegisterBank,
) {
    let slave = ModbusSlave::new(DEFAULT_SLAVE_ADDRESS);
    let mut rx_buf = [0u8; MAX_FRAME_LEN];
    let mut tx_buf = [0u8; MAX_FRAME_LEN];

    info!("Modbus task started (slave address {})", slave.address());

    loop {
        // フレーム受信（ライン・アイドルで区切る）
        let len = match uart.read_until_idle(&mut rx_buf).await {
            Ok(len) => len,
            Err(e) => {
                warn!("UART RX error: {:?}", e);
                continue;
            }
        };

        // 他局宛てのフレームは無視
        let Some(reply) = slave.process(&rx_buf[..len], &mut regs, &mut tx_buf) else {
            continue;
        };

        // 応答はコマンド実行前に返す
        if reply.response_len > 0 {
            if let Err(e) = uart.write(&tx_buf[..reply.response_len]).await {
                warn!("UART TX error: {:?}", e);
            }
        }

        // コマンドビット処理（移動完了までブロック）
        bridge.poll(&mut regs, reply.transaction);
        if reply.transaction == Transaction::Ok {
            debug!(
                "Registers: ready={}, position={}, error={}",
                regs[reg::READY],
                regs[reg::POSITION],
                regs[reg::ERROR_CODE]
            );
        }

        state::publish(&regs).await;
    }
}
