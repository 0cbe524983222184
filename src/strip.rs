/// WS2812 status strip task.
///
/// Effects are computed as frames of packed colors by the library and
/// pushed here through a MOSI-only SPI: at 3 MHz every WS2812 bit becomes
/// a fixed byte pattern, so the task never bit-bangs or busy-waits. The
/// strip sweeps while a radio tool runs and glows dim in the menu, scaled
/// by the persisted brightness setting.
use core::sync::atomic::Ordering;

use embassy_time::{Duration, Timer};
use esp_hal::spi::master::Spi;
use esp_hal::Blocking;
use smart_leds::{brightness, gamma, SmartLedsWrite, RGB8};
use ws2812_spi::Ws2812;

use crate::leds::{self, ScanEffect};
use crate::{board, BRIGHTNESS, IN_ACTIVITY, SETTING_FIELD, SETTING_NONE};

/// Sweep color while a radio tool runs.
const ACTIVE: leds::Color = leds::rgb(0x40, 0x00, 0x60);
/// Idle glow while browsing the menu or adjusting settings.
const IDLE: leds::Color = leds::rgb(0x00, 0x10, 0x20);

const FRAME_MS: u64 = 80;

#[embassy_executor::task]
pub async fn strip_task(spi: Spi<'static, Blocking>) {
    let mut strip = Ws2812::new(spi);
    let mut effect = ScanEffect::new();
    let mut frame = [leds::OFF; board::LED_COUNT];
    let mut write_failed = false;

    log::info!("led strip on pin {} ({} pixels)", board::LED_PIN, board::LED_COUNT);

    loop {
        let tool_running = IN_ACTIVITY.load(Ordering::Relaxed)
            && SETTING_FIELD.load(Ordering::Relaxed) == SETTING_NONE;
        if tool_running {
            effect.step(&mut frame, ACTIVE);
        } else {
            leds::fill(&mut frame, IDLE);
        }

        let level = BRIGHTNESS.load(Ordering::Relaxed);
        let pixels = frame.iter().map(|&color| {
            let (r, g, b) = leds::channels(color);
            RGB8::new(r, g, b)
        });
        if strip.write(brightness(gamma(pixels), level)).is_err() && !write_failed {
            write_failed = true;
            log::warn!("led strip write failed");
        }

        Timer::after(Duration::from_millis(FRAME_MS)).await;
    }
}
