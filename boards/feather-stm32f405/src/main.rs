#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod clock;
mod eth;
mod network;
mod relay;

stm32_tim2_monotonic!(Mono, 1_000_000);

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1])]
mod app {
    use super::*;
    use defmt::{error, info};
    use embassy_futures::join::join3;
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Output, Pull, Speed};
    use embassy_stm32::i2c::{self, I2c};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{Hse, HseMode};
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use relay_core::ThermistorSensor;

    use network::{manager, NetworkConfig};

    type SpiPeripheral = embassy_stm32::Peri<'static, peripherals::SPI2>;
    type PinPB13 = embassy_stm32::Peri<'static, peripherals::PB13>;
    type PinPB15 = embassy_stm32::Peri<'static, peripherals::PB15>;
    type PinPB14 = embassy_stm32::Peri<'static, peripherals::PB14>;
    type PinPC6 = embassy_stm32::Peri<'static, peripherals::PC6>;
    type PinPC3 = embassy_stm32::Peri<'static, peripherals::PC3>;
    type PinPC2 = embassy_stm32::Peri<'static, peripherals::PC2>;
    type ExtiChannel = embassy_stm32::Peri<'static, peripherals::EXTI2>;
    type DmaTx = embassy_stm32::Peri<'static, peripherals::DMA1_CH4>;
    type DmaRx = embassy_stm32::Peri<'static, peripherals::DMA1_CH3>;
    type RngPeripheral = embassy_stm32::Peri<'static, peripherals::RNG>;

    /// Thermistor coprocessor bus: I2C1, SCL=PB6, SDA=PB7
    struct SensorPeripherals {
        i2c: embassy_stm32::Peri<'static, peripherals::I2C1>,
        scl: embassy_stm32::Peri<'static, peripherals::PB6>,
        sda: embassy_stm32::Peri<'static, peripherals::PB7>,
    }

    struct NetworkPeripherals {
        spi: SpiPeripheral,
        sck: PinPB13,
        mosi: PinPB15,
        miso: PinPB14,
        cs: PinPC6,
        reset: PinPC3,
        int: PinPC2,
        exti: ExtiChannel,
        dma_tx: DmaTx,
        dma_rx: DmaRx,
    }

    // RNG interrupt binding for hardware random number generator
    embassy_stm32::bind_interrupts!(struct RngIrqs {
        RNG => embassy_stm32::rng::InterruptHandler<peripherals::RNG>;
    });

    #[shared]
    struct Shared {}

    #[local]
    struct Local {}

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("Temperature relay starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        // VCO / DIVQ(7) = 48 MHz (RNG clock)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        let p = embassy_stm32::init(config);
        info!("PLL configured: SYSCLK=84MHz, PLLQ=48MHz for RNG");

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        let timer_clock_hz = 84_000_000;
        Mono::start(timer_clock_hz);
        info!("TIM2 monotonic timer initialized at 1 MHz");

        let relay_config = match network::config::relay_config() {
            Ok(config) => config,
            Err(e) => {
                error!("Invalid relay configuration: {}", e);
                return (Shared {}, Local {});
            }
        };

        let sensor_periph = SensorPeripherals {
            i2c: p.I2C1,
            scl: p.PB6,
            sda: p.PB7,
        };

        let net_periph = NetworkPeripherals {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };

        if relay_task::spawn(net_periph, sensor_periph, p.RNG, relay_config).is_err() {
            error!("Failed to spawn relay task");
        }

        (Shared {}, Local {})
    }

    /// Relay task - owns the network stack and runs the relay pass
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1)]
    async fn relay_task(
        _cx: relay_task::Context,
        periph: NetworkPeripherals,
        sensor_periph: SensorPeripherals,
        rng_periph: RngPeripheral,
        relay_config: relay_core::RelayConfig,
    ) {
        use embassy_net::{Config, StackResources};
        use embassy_stm32::rng::Rng;
        use static_cell::StaticCell;

        info!("Relay task started");

        let mut i2c_config = i2c::Config::default();
        i2c_config.frequency = Hertz(100_000);
        let i2c = I2c::new_blocking(
            sensor_periph.i2c,
            sensor_periph.scl,
            sensor_periph.sda,
            i2c_config,
        );
        let mut sensor = ThermistorSensor::new(i2c, relay_config.sensor);
        info!(
            "Sensor on I2C1 at address {=u8:#x}",
            relay_config.sensor.i2c_address
        );

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000); // 10 MHz for W5500

        let spi = Spi::new(
            periph.spi,
            periph.sck,
            periph.mosi,
            periph.miso,
            periph.dma_tx,
            periph.dma_rx,
            spi_config,
        );

        let eth_pins = eth::EthPins {
            spi,
            cs: Output::new(periph.cs, Level::High, Speed::VeryHigh),
            reset: Output::new(periph.reset, Level::High, Speed::Low),
            int: ExtiInput::new(periph.int, periph.exti, Pull::Up),
        };

        let net_config = NetworkConfig::default();
        let (device, w5500_runner) = match eth::bring_up(eth_pins, net_config.mac_addr).await {
            Ok(parts) => parts,
            Err(e) => {
                error!("Ethernet unavailable: {}", e);
                return;
            }
        };

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            net_config.seed,
        );
        info!("Network stack initialized with DHCP");

        let app_logic = async {
            manager::wait_for_config(&stack).await;
            let mut rng = Rng::new(rng_periph, RngIrqs);
            relay::run(stack, relay_config, &mut sensor, &mut rng).await;
            // Keep the socket layer serviced; nothing else to do
            core::future::pending::<()>().await;
        };

        join3(w5500_runner.run(), net_runner.run(), app_logic).await;
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        info!("Idle task started - entering WFI loop");
        loop {
            cortex_m::asm::wfi();
        }
    }
}
