/// OLED display task for the SSD1306 128x64 over I2C.
///
/// Implements the library's `Screen` boundary: full redraw per call from
/// the menu labels and selection index, a single activity label, or a
/// settings adjust screen. The selected row marquee-scrolls when its label
/// is wider than the screen, on the settings-controlled cadence.
use core::fmt::Write as _;
use core::sync::atomic::Ordering;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;
use esp_hal::i2c::master::I2c;
use esp_hal::Blocking;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use embassy_time::{with_timeout, Duration, Instant};

use crate::menu::{self, Marquee, Screen};
use crate::{
    board, BRIGHTNESS, IN_ACTIVITY, MENU, REDRAW, SCROLL_SPEED_MS, SELECTED, SETTING_BRIGHTNESS,
    SETTING_FIELD, SETTING_SCROLL,
};

/// Characters of FONT_6X10 that fit on one 128 px row.
const ROW_CHARS: usize = 21;
/// Rows visible below the header.
const VISIBLE_ROWS: usize = 5;
const ROW_HEIGHT: i32 = 11;
const HEADER_HEIGHT: i32 = 9;

type Oled = Ssd1306<
    I2CInterface<I2c<'static, Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// `Screen` implementation over the buffered SSD1306 driver.
struct OledScreen {
    oled: Oled,
    marquee_offset: usize,
}

impl OledScreen {
    fn text(&mut self, s: &str, x: i32, y: i32, inverted: bool) {
        let color = if inverted {
            BinaryColor::Off
        } else {
            BinaryColor::On
        };
        let style = MonoTextStyle::new(&FONT_6X10, color);
        // Baseline offset: FONT_6X10 ascends 8 px above the baseline.
        let _ = Text::new(s, Point::new(x, y + 8), style).draw(&mut self.oled);
    }

    fn flush(&mut self) {
        if let Err(e) = self.oled.flush() {
            log::error!("display flush failed: {:?}", e);
        }
    }
}

impl Screen for OledScreen {
    fn draw_menu(&mut self, items: &[&'static str], selected: usize) {
        self.oled.clear_buffer();
        self.text("dialbox", 0, 0, false);

        // Keep the selected row inside the visible window.
        let first = selected.saturating_sub(VISIBLE_ROWS - 1);
        for (row, (index, label)) in items
            .iter()
            .enumerate()
            .skip(first)
            .take(VISIBLE_ROWS)
            .enumerate()
        {
            let y = HEADER_HEIGHT + row as i32 * ROW_HEIGHT;
            let is_selected = index == selected;
            if is_selected {
                let _ = Rectangle::new(Point::new(0, y), Size::new(128, ROW_HEIGHT as u32))
                    .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                    .draw(&mut self.oled);
            }
            let offset = if is_selected { self.marquee_offset } else { 0 };
            let windowed = menu::window(label, ROW_CHARS, offset);
            self.text(&windowed, 2, y + 1, is_selected);
        }
        self.flush();
    }

    fn draw_activity(&mut self, label: &str) {
        self.oled.clear_buffer();
        self.text(label, 0, 0, false);
        self.text("press to exit", 2, 28, false);
        self.flush();
    }

    fn draw_setting(&mut self, name: &'static str, value: u8) {
        self.oled.clear_buffer();
        self.text(name, 0, 0, false);

        let mut digits: heapless::String<4> = heapless::String::new();
        let _ = write!(digits, "{}", value);
        self.text(&digits, 0, 16, false);

        // Bar proportional to the full u8 range.
        let width = value as u32 * 128 / 255;
        let _ = Rectangle::new(Point::new(0, 34), Size::new(width, 8))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut self.oled);

        self.text("press for next", 2, 52, false);
        self.flush();
    }
}

#[embassy_executor::task]
pub async fn display_task(i2c: I2c<'static, Blocking>) {
    let interface = I2CDisplayInterface::new_custom_address(i2c, board::OLED_ADDR);
    let mut oled = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    oled.init().expect("display init failed");

    let mut applied_brightness = BRIGHTNESS.load(Ordering::Relaxed);
    let _ = oled.set_brightness(Brightness::custom(1, applied_brightness));

    log::info!("display initialized at 0x{:02X}", board::OLED_ADDR);

    let mut screen = OledScreen {
        oled,
        marquee_offset: 0,
    };
    let mut marquee_speed = SCROLL_SPEED_MS.load(Ordering::Relaxed);
    let mut marquee = Marquee::new(marquee_speed);
    let mut last_tick = Instant::now();

    loop {
        // Pick up settings changes made while running.
        let level = BRIGHTNESS.load(Ordering::Relaxed);
        if level != applied_brightness {
            applied_brightness = level;
            let _ = screen.oled.set_brightness(Brightness::custom(1, level));
        }
        let speed = SCROLL_SPEED_MS.load(Ordering::Relaxed);
        if speed != marquee_speed {
            marquee_speed = speed;
            marquee = Marquee::new(speed);
        }

        let selected = SELECTED.load(Ordering::Relaxed);
        let label = MENU.items().get(selected).copied().unwrap_or("");

        let now = Instant::now();
        let elapsed = (now - last_tick).as_millis() as u32;
        last_tick = now;
        screen.marquee_offset = marquee.tick(elapsed, label.chars().count(), ROW_CHARS);

        match SETTING_FIELD.load(Ordering::Relaxed) {
            SETTING_BRIGHTNESS => screen.draw_setting("Brightness", level),
            SETTING_SCROLL => screen.draw_setting("Scroll speed", speed),
            _ if IN_ACTIVITY.load(Ordering::Relaxed) => screen.draw_activity(label),
            _ => screen.draw_menu(MENU.items(), selected),
        }

        // Redraw on demand, or on the marquee cadence at the latest.
        let _ = with_timeout(Duration::from_millis(100), REDRAW.wait()).await;
    }
}
