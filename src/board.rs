/// Hardware abstraction for supported boards.
///
/// Each board module defines pin assignments and capabilities
/// selected at compile time via feature flags.

#[cfg(feature = "board-devkit")]
mod hw {
    /// Rotary encoder phase A
    pub const ENCODER_PIN_A: u8 = 25;
    /// Rotary encoder phase B
    pub const ENCODER_PIN_B: u8 = 27;
    /// Encoder push-button (select)
    pub const SELECT_PIN: u8 = 33;
    pub const LED_PIN: u8 = 14; // WS2812 strip data
    pub const LED_COUNT: usize = 8;
    pub const OLED_ADDR: u8 = 0x3C;
    /// One dispatch slot per hardware interrupt source (XCHAL_NUM_INTERRUPTS)
    pub const INTERRUPT_LINES: usize = 32;
    pub const BOARD_NAME: &str = "esp32_devkit";
}

#[cfg(feature = "board-mini")]
mod hw {
    pub const ENCODER_PIN_A: u8 = 5;
    pub const ENCODER_PIN_B: u8 = 6;
    pub const SELECT_PIN: u8 = 7;
    pub const LED_PIN: u8 = 9;
    pub const LED_COUNT: usize = 1;
    pub const OLED_ADDR: u8 = 0x3C;
    pub const INTERRUPT_LINES: usize = 32;
    pub const BOARD_NAME: &str = "mini_esp32s3";
}

#[cfg(not(any(feature = "board-devkit", feature = "board-mini")))]
mod hw {
    /// Host/fallback target: 16 lines, one per pin.
    pub const INTERRUPT_LINES: usize = 16;
    pub const BOARD_NAME: &str = "host";
}

pub use hw::*;

/// Map a GPIO number to its external-interrupt line, or `None` if the pin
/// cannot raise interrupts on this board. The `digitalPinToInterrupt`
/// analogue: on ESP32-class chips the line index is the pin number itself.
pub fn interrupt_line(pin: u8) -> Option<u8> {
    ((pin as usize) < INTERRUPT_LINES).then_some(pin)
}
