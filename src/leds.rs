/// Addressable LED strip effects, computed as frames of packed colors.
///
/// The strip driver is a collaborator: these functions only fill a frame
/// buffer; pushing pixels to the wire happens elsewhere. Effects do one
/// bounded step per call so the outer scheduler stays responsive.

/// Packed `0x00RRGGBB` color.
pub type Color = u32;

pub const OFF: Color = 0;

pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Unpack a color into its `(r, g, b)` channels for the strip driver.
pub const fn channels(color: Color) -> (u8, u8, u8) {
    ((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

/// Set every pixel in the frame to `color`.
pub fn fill(frame: &mut [Color], color: Color) {
    frame.fill(color);
}

/// Turn every pixel off.
pub fn clear(frame: &mut [Color]) {
    fill(frame, OFF);
}

/// Scan animation: one lit pixel sweeping along the strip, one pixel
/// advance per step, wrapping at the end.
pub struct ScanEffect {
    cursor: usize,
}

impl ScanEffect {
    pub const fn new() -> Self {
        Self { cursor: 0 }
    }

    /// Render the current step into `frame` and advance the cursor.
    pub fn step(&mut self, frame: &mut [Color], color: Color) {
        clear(frame);
        if frame.is_empty() {
            return;
        }
        self.cursor %= frame.len();
        frame[self.cursor] = color;
        self.cursor = (self.cursor + 1) % frame.len();
    }
}

impl Default for ScanEffect {
    fn default() -> Self {
        Self::new()
    }
}
