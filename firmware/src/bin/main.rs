#![no_std]
#![no_main]

use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select3, Either3};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART1;
use embassy_rp::uart::{BufferedInterruptHandler, BufferedUartRx, BufferedUartTx, Config as UartConfig, Uart};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant, Ticker, Timer};
use embedded_io_async::Read;
use gatepro_firmware::{log_controls, DriverConfig, GateProDriver, HostCommand};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});

/// Gate controller serial speed.
const GATE_BAUDRATE: u32 = 9_600;

/// How often the driver checks deadlines and polls.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Debounce time for the push button.
const DEBOUNCE: Duration = Duration::from_millis(50);

const RX_CHUNK: usize = 64;

/// Host requests for the gate task.
static COMMANDS: Channel<CriticalSectionRawMutex, HostCommand, 4> = Channel::new();

// UART buffers must live forever
static TX_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("GatePro bridge starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- UART Setup ---
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = GATE_BAUDRATE;

    let tx_buf = TX_BUF.init([0u8; 128]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(
        p.UART1,
        p.PIN_8, // TX
        p.PIN_9, // RX
        uart_config,
    );
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    // Push button to ground, toggles the gate
    let button = Input::new(p.PIN_15, Pull::Up);

    // Optional: LED for error indication (on-board LED on Pico)
    let led = Output::new(p.PIN_25, Level::Low);

    // Spawn tasks (unwrap the SpawnToken, then spawn)
    spawner.spawn(gate_task(tx, rx, led).unwrap());
    spawner.spawn(button_task(button).unwrap());

    info!("GatePro bridge initialized, polling controller...");
}

/// Gate task - owns the driver and feeds it bytes, ticks and host requests.
#[embassy_executor::task]
async fn gate_task(tx: BufferedUartTx, mut rx: BufferedUartRx, mut led: Output<'static>) {
    let mut gate = match GateProDriver::new(tx, DriverConfig::default()) {
        Ok(gate) => gate,
        Err(e) => {
            error!("Invalid driver config: {:?}", e);
            return;
        }
    };
    gate.set_controls(log_controls());

    let mut ticker = Ticker::every(TICK_INTERVAL);
    let mut buf = [0u8; RX_CHUNK];

    loop {
        let event = select3(rx.read(&mut buf), ticker.next(), COMMANDS.receive()).await;
        match event {
            Either3::First(Ok(n)) => {
                let frames = gate.on_bytes(&buf[..n]);
                if frames > 0 {
                    info!("Gate {:?} at {:?}", gate.operation(), gate.position());
                }
            }
            Either3::First(Err(e)) => {
                warn!("UART read error: {:?}", e);
                led.toggle();
            }
            Either3::Second(()) => {
                if let Err(e) = gate.tick(Instant::now()) {
                    error!("Gate error: {}", e);
                    // Toggle LED to indicate error
                    led.toggle();
                }
            }
            Either3::Third(command) => {
                if let Err(e) = command.apply(&mut gate) {
                    warn!("{:?} rejected: {}", command, e);
                }
            }
        }
    }
}

/// Button task - sends a toggle request on each debounced press.
#[embassy_executor::task]
async fn button_task(mut button: Input<'static>) {
    loop {
        button.wait_for_falling_edge().await;
        Timer::after(DEBOUNCE).await;
        if button.is_low() {
            info!("Button pressed");
            COMMANDS.send(HostCommand::Toggle).await;
            button.wait_for_high().await;
        }
    }
}
