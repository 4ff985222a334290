#![deny(unsafe_code)]
#![deny(warnings)]
//! W5500 bring-up on the FeatherWing SPI bus

use defmt::{error, info};
use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice as SpiDeviceBus;
use embassy_net_wiznet::chip::W5500;
use embassy_net_wiznet::{Device, Runner, State};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Async;
use embassy_stm32::spi::Spi;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Timer;
use static_cell::StaticCell;

use crate::network::NetworkError;

type SharedSpi = Mutex<CriticalSectionRawMutex, Spi<'static, Async>>;
type ChipSpi = SpiDeviceBus<'static, CriticalSectionRawMutex, Spi<'static, Async>, Output<'static>>;

/// Driver task for the chip; `run()` it alongside the net stack
pub type EthRunner = Runner<'static, W5500, ChipSpi, ExtiInput<'static>, Output<'static>>;

pub struct EthPins {
    pub spi: Spi<'static, Async>,
    pub cs: Output<'static>,
    pub reset: Output<'static>,
    pub int: ExtiInput<'static>,
}

/// Reset the chip and hand back the embassy-net device and its runner
///
/// Can only be called once: the SPI bus and driver state are `'static`.
pub async fn bring_up(
    pins: EthPins,
    mac: [u8; 6],
) -> Result<(Device<'static>, EthRunner), NetworkError> {
    let EthPins { spi, cs, mut reset, int } = pins;

    pulse_reset(&mut reset).await;

    static BUS: StaticCell<SharedSpi> = StaticCell::new();
    let chip_spi = SpiDeviceBus::new(BUS.init(Mutex::new(spi)), cs);

    static STATE: StaticCell<State<8, 8>> = StaticCell::new();
    let state = STATE.init(State::new());

    match embassy_net_wiznet::new(mac, state, chip_spi, int, reset).await {
        Ok(parts) => {
            info!("W5500 up, mac {:02x}", mac);
            Ok(parts)
        }
        Err(e) => {
            error!("W5500 did not answer: {:?}", defmt::Debug2Format(&e));
            Err(NetworkError::EthernetInit)
        }
    }
}

/// RSTn low for 1 ms, then 2 ms for the PLL to lock
async fn pulse_reset(reset: &mut Output<'static>) {
    reset.set_low();
    Timer::after_millis(1).await;
    reset.set_high();
    Timer::after_millis(2).await;
}
