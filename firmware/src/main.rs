#![no_std]
#![no_main]

mod fmt;

mod config;
mod hardware;
mod state;
mod tasks;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use embassy_executor::Spawner;
use embassy_stm32::{
    gpio::{Level, Output, Speed},
    usart::Uart,
};
use embassy_time::{Delay, Duration, Timer};

use trv_actuator::registers::{self, reg};
use trv_actuator::{register_bridge, ActuatorPins, PositionDriver, RegisterBridge, Transaction};

use fmt::*;
use hardware::Irqs;
use tasks::{led_task, modbus_task};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // ハードウェア初期化
    let clock_config = hardware::create_clock_config();
    let p = embassy_stm32::init(clock_config);

    info!("═══════════════════════════════════════════════════════════════════");
    info!("");
    info!("        TRV Linear Actuator • STM32G431VB @ 170MHz");
    info!("        Stepper STEP/DIR drive • Modbus RTU slave");
    info!("");
    info!("═══════════════════════════════════════════════════════════════════");

    let status_led = Output::new(p.PC13, Level::Low, Speed::Low);
    let mut regs = registers::new_bank();

    // 設定検証（失敗時はドライバを初期化せず停止）
    let actuator_config = config::actuator_config();
    if let Err(e) = actuator_config.validate() {
        error!("Invalid actuator config: {:?}", e);
        register_bridge::report_config_invalid(&mut regs);
        state::publish(&regs).await;
        spawner.spawn(led_task(status_led)).unwrap();
        loop {
            Timer::after(Duration::from_millis(1000)).await;
        }
    }

    info!("Actuator config:");
    info!(
        "  velocity={} steps/s, microsteps={}, total_steps={}",
        actuator_config.velocity, actuator_config.microsteps, actuator_config.total_steps
    );
    info!(
        "  overdrive={} / initial overdrive={} steps",
        actuator_config.overdrive_steps, actuator_config.init_overdrive_steps
    );
    info!(
        "  high_time={}us, holding_time={}ms, max_rel_position={}",
        actuator_config.high_time_us,
        actuator_config.holding_time_ms,
        actuator_config.max_rel_position
    );

    // ドライバIC出力ピン初期化
    let pins = ActuatorPins {
        enable: Output::new(p.PB0, Level::Low, Speed::Low),
        step: Output::new(p.PB1, Level::Low, Speed::VeryHigh),
        direction: Output::new(p.PB2, Level::Low, Speed::Low),
        busy: Output::new(p.PC14, Level::Low, Speed::Low),
    };
    let driver = PositionDriver::new(actuator_config, pins, Delay).unwrap();
    info!("Step timeout: {}us", driver.step_timeout_us());

    let mut bridge = RegisterBridge::new(driver);
    bridge.publish_status(&mut regs);

    // 起動時キャリブレーション（位置は電源断で失われるため）
    // 失敗時はFULL_OVERDRIVEビットが残り、マスターからの再要求を待つ
    if config::CALIBRATE_ON_STARTUP {
        info!("Startup calibration (initial overdrive)...");
        regs[reg::FULL_OVERDRIVE] = 1;
        bridge.poll(&mut regs, Transaction::Ok);
    } else {
        info!("Startup calibration skipped, waiting for full overdrive command");
    }
    state::publish(&regs).await;

    // ステータスLEDタスク起動
    spawner.spawn(led_task(status_led)).unwrap();

    // Modbus (USART2) 初期化＆タスク起動
    let uart_config = hardware::create_uart_config(config::modbus::DEFAULT_BAUDRATE);
    let uart = Uart::new_with_de(
        p.USART2,
        p.PA3,
        p.PA2,
        Irqs,
        p.PA1,
        p.DMA1_CH1,
        p.DMA1_CH2,
        uart_config,
    )
    .unwrap();
    spawner.spawn(modbus_task(uart, bridge, regs)).unwrap();
    info!(
        "Modbus RTU started: {} baud, slave address {}",
        config::modbus::DEFAULT_BAUDRATE,
        config::modbus::DEFAULT_SLAVE_ADDRESS
    );

    // メインループ（将来の拡張用）
    loop {
        Timer::after(Duration::from_millis(100)).await;
    }
}
