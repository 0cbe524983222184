//! dialbox — rotary-dial RF multi-tool
//!
//! A hand-held probe with an OLED menu driven by a quadrature rotary
//! encoder. The encoder is decoded entirely in interrupt context through
//! the library's dispatch table; the UI task polls the accumulated
//! position at its own cadence and never blocks on the decoder.
//!
//! Radio activities (nRF24 channel analyzer and scanner) run as bounded
//! poll loops selected from the menu; a WS2812 strip mirrors the UI state.

#![no_std]
#![no_main]

use esp_backtrace as _;

esp_bootloader_esp_idf::esp_app_desc!();

// Hardware-specific modules (binary crate only)
mod display;
mod strip;

// Re-export library modules so binary submodules can use crate::*
pub(crate) use dialbox::{activity, board, dispatch, encoder, leds, menu, settings, VERSION};

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use esp_hal::gpio::{AnyPin, Event, Input, InputConfig, Io, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::spi::Mode;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::Blocking;
use esp_storage::FlashStorage;
use static_cell::StaticCell;

use activity::{Activity, ChannelSweep, RadioProbe, SignalScan};
use dispatch::{DispatchTable, EdgeOrigin};
use encoder::{Encoder, QuadratureSource};
use menu::Menu;
use settings::{BlockStore, Settings};

#[cfg(not(any(feature = "board-devkit", feature = "board-mini")))]
compile_error!("select a board: --features devkit or --features mini");

/// Top-level menu, one entry per selectable mode.
static MENU: Menu = Menu::new(&["Analyzer", "Scanner", "Settings"]);

/// The single owned dispatch table definition, one slot per interrupt
/// line. Populated once in `main`, read-only afterwards.
static DISPATCH: DispatchTable<'static, { board::INTERRUPT_LINES }> = DispatchTable::new();

/// Encoder instance storage; initialized in `main` and registered into
/// DISPATCH under both pin lines.
static ENCODER: StaticCell<Encoder<PanelPins>> = StaticCell::new();

/// Encoder pin pair, shared with the GPIO vector for level reads and edge
/// acknowledgement.
static PIN_A: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));
static PIN_B: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));

// ── UI state shared between tasks ────────────────────────────────────

pub(crate) static SELECTED: AtomicUsize = AtomicUsize::new(0);
pub(crate) static IN_ACTIVITY: AtomicBool = AtomicBool::new(false);
pub(crate) static BRIGHTNESS: AtomicU8 = AtomicU8::new(settings::DEFAULT_BRIGHTNESS);
pub(crate) static SCROLL_SPEED_MS: AtomicU8 = AtomicU8::new(settings::DEFAULT_SCROLL_SPEED_MS);

/// Which settings field is being adjusted, if any.
pub(crate) const SETTING_NONE: u8 = 0;
pub(crate) const SETTING_BRIGHTNESS: u8 = 1;
pub(crate) const SETTING_SCROLL: u8 = 2;
pub(crate) static SETTING_FIELD: AtomicU8 = AtomicU8::new(SETTING_NONE);

/// Wakes the display task for an immediate redraw.
pub(crate) static REDRAW: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Settings persist in a dedicated flash block (the stock partition
/// table's NVS data area).
const SETTINGS_FLASH_OFFSET: u32 = 0x9000;

type FlashSettings = Settings<BlockStore<FlashStorage>>;

/// GPIO assignment for one board, kept in step with the pin-number
/// constants in board.rs.
struct PanelGpio {
    encoder_a: AnyPin<'static>,
    encoder_b: AnyPin<'static>,
    select: AnyPin<'static>,
    strip_data: AnyPin<'static>,
    sda: AnyPin<'static>,
    scl: AnyPin<'static>,
    sck: AnyPin<'static>,
    mosi: AnyPin<'static>,
    miso: AnyPin<'static>,
    csn: AnyPin<'static>,
    ce: AnyPin<'static>,
}

/// Raw level reads over the shared pin statics. Called from interrupt
/// context on every edge; the nested critical section is bounded.
struct PanelPins;

impl QuadratureSource for PanelPins {
    fn pin_a(&self) -> bool {
        critical_section::with(|cs| {
            PIN_A
                .borrow_ref(cs)
                .as_ref()
                .map(|pin| pin.is_high())
                .unwrap_or(false)
        })
    }

    fn pin_b(&self) -> bool {
        critical_section::with(|cs| {
            PIN_B
                .borrow_ref(cs)
                .as_ref()
                .map(|pin| pin.is_high())
                .unwrap_or(false)
        })
    }
}

/// Shared GPIO vector. The per-pin interrupt status identifies which pin
/// fired; each flagged pin dispatches on its own line. If the vector runs
/// with no flag readable the table scans every registered instance — a
/// resample with unchanged levels is a no-op, so nothing is double-counted.
#[esp_hal::handler]
fn gpio_edge_handler() {
    let (a_fired, b_fired) = critical_section::with(|cs| {
        let mut a_fired = false;
        let mut b_fired = false;
        if let Some(pin) = PIN_A.borrow_ref_mut(cs).as_mut() {
            a_fired = pin.is_interrupt_set();
            pin.clear_interrupt();
        }
        if let Some(pin) = PIN_B.borrow_ref_mut(cs).as_mut() {
            b_fired = pin.is_interrupt_set();
            pin.clear_interrupt();
        }
        (a_fired, b_fired)
    });

    if a_fired {
        DISPATCH.dispatch_edge(EdgeOrigin::Line(board::ENCODER_PIN_A));
    }
    if b_fired {
        DISPATCH.dispatch_edge(EdgeOrigin::Line(board::ENCODER_PIN_B));
    }
    if !a_fired && !b_fired {
        DISPATCH.dispatch_edge(EdgeOrigin::Unknown);
    }
}

// ── nRF24 carrier probe (register-level SPI boundary) ────────────────

const NRF24_RF_CH: u8 = 0x05;
const NRF24_RPD: u8 = 0x09;
const NRF24_WRITE_REG: u8 = 0x20;

/// Minimal nRF24 access: tune RF_CH, read the received-power-detect bit.
/// The radio protocol itself lives on the other side of this boundary.
struct Nrf24Probe {
    spi: Spi<'static, Blocking>,
    csn: Output<'static>,
    _ce: Output<'static>,
}

impl Nrf24Probe {
    fn write_register(&mut self, reg: u8, value: u8) {
        self.csn.set_low();
        let mut frame = [NRF24_WRITE_REG | reg, value];
        let _ = self.spi.transfer_in_place(&mut frame);
        self.csn.set_high();
    }

    fn read_register(&mut self, reg: u8) -> u8 {
        self.csn.set_low();
        let mut frame = [reg, 0x00];
        let _ = self.spi.transfer_in_place(&mut frame);
        self.csn.set_high();
        frame[1]
    }
}

impl RadioProbe for Nrf24Probe {
    fn set_channel(&mut self, channel: u8) {
        self.write_register(NRF24_RF_CH, channel);
    }

    fn carrier_detected(&mut self) -> bool {
        self.read_register(NRF24_RPD) & 1 == 1
    }
}

// ── Entry point ──────────────────────────────────────────────────────

#[esp_rtos::main]
async fn main(spawner: embassy_executor::Spawner) {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Start the RTOS — requires timer + software interrupt
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    log::info!("dialbox v{} starting on {}", VERSION, board::BOARD_NAME);

    // Per-board GPIO map, matching the constants in board.rs.
    #[cfg(feature = "board-devkit")]
    let pins = PanelGpio {
        encoder_a: peripherals.GPIO25.into(),
        encoder_b: peripherals.GPIO27.into(),
        select: peripherals.GPIO33.into(),
        strip_data: peripherals.GPIO14.into(),
        sda: peripherals.GPIO21.into(),
        scl: peripherals.GPIO22.into(),
        sck: peripherals.GPIO18.into(),
        mosi: peripherals.GPIO23.into(),
        miso: peripherals.GPIO19.into(),
        csn: peripherals.GPIO17.into(),
        ce: peripherals.GPIO16.into(),
    };
    #[cfg(feature = "board-mini")]
    let pins = PanelGpio {
        encoder_a: peripherals.GPIO5.into(),
        encoder_b: peripherals.GPIO6.into(),
        select: peripherals.GPIO7.into(),
        strip_data: peripherals.GPIO9.into(),
        sda: peripherals.GPIO1.into(),
        scl: peripherals.GPIO2.into(),
        sck: peripherals.GPIO12.into(),
        mosi: peripherals.GPIO11.into(),
        miso: peripherals.GPIO13.into(),
        csn: peripherals.GPIO10.into(),
        ce: peripherals.GPIO8.into(),
    };

    // Persisted settings seed the shared UI state. A blank chip boots with
    // the defaults.
    let user_settings = Settings::load(BlockStore::new(
        FlashStorage::new(),
        SETTINGS_FLASH_OFFSET,
    ));
    BRIGHTNESS.store(user_settings.brightness(), Ordering::Relaxed);
    SCROLL_SPEED_MS.store(user_settings.menu_scroll_speed(), Ordering::Relaxed);

    // Encoder inputs: pulled-up, both-edge interrupts on the shared vector.
    let mut io = Io::new(peripherals.IO_MUX);
    io.set_interrupt_handler(gpio_edge_handler);

    let input_config = InputConfig::default().with_pull(Pull::Up);
    let mut pin_a = Input::new(pins.encoder_a, input_config);
    let mut pin_b = Input::new(pins.encoder_b, input_config);
    pin_a.listen(Event::AnyEdge);
    pin_b.listen(Event::AnyEdge);
    critical_section::with(|cs| {
        PIN_A.borrow_ref_mut(cs).replace(pin_a);
        PIN_B.borrow_ref_mut(cs).replace(pin_b);
    });

    // Encoder: seeds its state from the resting pin levels, then registers
    // under both interrupt lines. An interrupt-incapable pin is skipped and
    // the encoder degrades instead of failing.
    let encoder: &'static Encoder<PanelPins> = ENCODER.init(Encoder::new(PanelPins));
    DISPATCH.attach_pins(encoder, board::ENCODER_PIN_A, board::ENCODER_PIN_B);

    log::info!(
        "encoder on pins {}/{} ({} dispatch slots)",
        board::ENCODER_PIN_A,
        board::ENCODER_PIN_B,
        board::INTERRUPT_LINES
    );

    let select = Input::new(pins.select, input_config);

    // nRF24 probe for the radio activities (10 MHz SPI, mode 0).
    let spi_config = SpiConfig::default()
        .with_frequency(Rate::from_mhz(10))
        .with_mode(Mode::_0);
    let spi = Spi::new(peripherals.SPI2, spi_config)
        .expect("SPI init failed")
        .with_sck(pins.sck)
        .with_mosi(pins.mosi)
        .with_miso(pins.miso);
    let probe = Nrf24Probe {
        spi,
        csn: Output::new(pins.csn, Level::High, OutputConfig::default()),
        _ce: Output::new(pins.ce, Level::High, OutputConfig::default()),
    };

    // WS2812 strip: a 3 MHz MOSI-only SPI clocks out the pulse train.
    let strip_config = SpiConfig::default()
        .with_frequency(Rate::from_mhz(3))
        .with_mode(Mode::_0);
    let strip_spi = Spi::new(peripherals.SPI3, strip_config)
        .expect("strip SPI init failed")
        .with_mosi(pins.strip_data);

    let i2c = I2c::new(peripherals.I2C0, I2cConfig::default())
        .expect("I2C init failed")
        .with_sda(pins.sda)
        .with_scl(pins.scl);

    spawner
        .spawn(ui_task(encoder, select, probe, user_settings))
        .unwrap();
    spawner.spawn(status_task(encoder)).unwrap();
    spawner.spawn(strip::strip_task(strip_spi)).unwrap();
    spawner.spawn(display::display_task(i2c)).unwrap();

    log::info!("tasks spawned");
}

// ── UI state machine ─────────────────────────────────────────────────

/// What the select button currently navigates. The nRF24 probe travels
/// into whichever tool is running and is parked while browsing.
enum UiState {
    Browse,
    Analyzer(ChannelSweep<Nrf24Probe>),
    Scanner(SignalScan<Nrf24Probe>),
    Brightness,
    ScrollSpeed,
}

/// One select-button press: enter the chosen entry from the menu, step
/// through the settings fields, or leave the running tool.
fn advance(
    state: UiState,
    encoder: &Encoder<PanelPins>,
    parked: &mut Option<Nrf24Probe>,
    user_settings: &mut FlashSettings,
) -> UiState {
    match state {
        UiState::Browse => {
            let selection = MENU.selection(encoder.read());
            match (MENU.items()[selection], parked.take()) {
                ("Analyzer", Some(probe)) => {
                    let mut sweep = ChannelSweep::new(probe);
                    sweep.setup();
                    IN_ACTIVITY.store(true, Ordering::Relaxed);
                    log::info!("entering {}", sweep.label());
                    UiState::Analyzer(sweep)
                }
                ("Scanner", Some(probe)) => {
                    let mut scan = SignalScan::new(probe);
                    scan.setup();
                    IN_ACTIVITY.store(true, Ordering::Relaxed);
                    log::info!("entering {}", scan.label());
                    UiState::Scanner(scan)
                }
                ("Settings", probe) => {
                    *parked = probe;
                    IN_ACTIVITY.store(true, Ordering::Relaxed);
                    SETTING_FIELD.store(SETTING_BRIGHTNESS, Ordering::Relaxed);
                    encoder.write((user_settings.brightness() / 5) as i32);
                    UiState::Brightness
                }
                (_, probe) => {
                    *parked = probe;
                    UiState::Browse
                }
            }
        }
        UiState::Analyzer(sweep) => {
            log::info!(
                "leaving {}: {} busy channels",
                sweep.label(),
                sweep.occupancy().iter().filter(|&&busy| busy).count()
            );
            *parked = Some(sweep.release());
            leave_to_menu(encoder)
        }
        UiState::Scanner(scan) => {
            log::info!("leaving {}", scan.label());
            *parked = Some(scan.release());
            leave_to_menu(encoder)
        }
        UiState::Brightness => {
            SETTING_FIELD.store(SETTING_SCROLL, Ordering::Relaxed);
            encoder.write((user_settings.menu_scroll_speed() / 10) as i32);
            UiState::ScrollSpeed
        }
        UiState::ScrollSpeed => leave_to_menu(encoder),
    }
}

/// Back to the menu with the encoder re-anchored on the current item, so
/// the list reopens where the user left it.
fn leave_to_menu(encoder: &Encoder<PanelPins>) -> UiState {
    IN_ACTIVITY.store(false, Ordering::Relaxed);
    SETTING_FIELD.store(SETTING_NONE, Ordering::Relaxed);
    encoder.write(SELECTED.load(Ordering::Relaxed) as i32);
    UiState::Browse
}

/// UI task — polls the encoder position and select button, runs the state
/// machine, and wakes the display on changes. The encoder itself needs no
/// polling; edges land in interrupt context.
#[embassy_executor::task]
async fn ui_task(
    encoder: &'static Encoder<PanelPins>,
    select: Input<'static>,
    probe: Nrf24Probe,
    mut user_settings: FlashSettings,
) {
    let mut state = UiState::Browse;
    let mut parked = Some(probe);
    let mut select_was_low = false;
    let mut last_selection = usize::MAX;

    loop {
        if matches!(state, UiState::Browse) {
            let selection = MENU.selection(encoder.read());
            if selection != last_selection {
                last_selection = selection;
                SELECTED.store(selection, Ordering::Relaxed);
                REDRAW.signal(());
            }
        }

        // Falling edge on the pulled-up select button advances the state.
        let select_low = select.is_low();
        if select_low && !select_was_low {
            state = advance(state, encoder, &mut parked, &mut user_settings);
            REDRAW.signal(());
        }
        select_was_low = select_low;

        match &mut state {
            UiState::Browse => {}
            // One bounded activity slice per loop turn.
            UiState::Analyzer(sweep) => sweep.poll(),
            UiState::Scanner(scan) => scan.poll(),
            // The dial adjusts the field; writing the clamped position back
            // keeps it from running far past the range. An untouched dial
            // sits on the stored value's own position, so nothing rewrites.
            UiState::Brightness => {
                let pos = encoder.read().clamp(0, 51);
                encoder.write(pos);
                if pos != (user_settings.brightness() / 5) as i32 {
                    let value = (pos * 5) as u8;
                    user_settings.set_brightness(value);
                    BRIGHTNESS.store(value, Ordering::Relaxed);
                    REDRAW.signal(());
                }
            }
            UiState::ScrollSpeed => {
                let pos = encoder.read().clamp(1, 25);
                encoder.write(pos);
                if pos != (user_settings.menu_scroll_speed() / 10) as i32 {
                    let value = (pos * 10) as u8;
                    user_settings.set_menu_scroll_speed(value);
                    SCROLL_SPEED_MS.store(value, Ordering::Relaxed);
                    REDRAW.signal(());
                }
            }
        }

        Timer::after(Duration::from_millis(10)).await;
    }
}

/// Periodic status reporting task
#[embassy_executor::task]
async fn status_task(encoder: &'static Encoder<PanelPins>) {
    loop {
        Timer::after(Duration::from_secs(30)).await;

        log::info!(
            "status: uptime {}s, position {}, item '{}', activity {}",
            (Instant::now().as_millis() / 1000) as u32,
            encoder.read(),
            MENU.items()[SELECTED.load(Ordering::Relaxed)],
            IN_ACTIVITY.load(Ordering::Relaxed),
        );
    }
}
