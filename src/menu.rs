/// Menu model and the display collaborator boundary.
///
/// Selection is derived from the rotary encoder's accumulated position —
/// one detent per item, wrapping in both directions. The display only ever
/// receives full-redraw requests; it keeps no state of its own.
use heapless::String;

/// Longest label the scroll window will compose.
pub const MAX_LABEL: usize = 32;

/// Display collaborator: redraws the whole screen from the given strings.
pub trait Screen {
    /// Draw the menu list with the item at `selected` highlighted.
    fn draw_menu(&mut self, items: &[&'static str], selected: usize);
    /// Draw the single-label activity screen (e.g. "Analyzer").
    fn draw_activity(&mut self, label: &str);
    /// Draw a one-value adjust screen for a settings field.
    fn draw_setting(&mut self, name: &'static str, value: u8);
}

/// Fixed list of menu entries, selected by encoder position.
pub struct Menu {
    items: &'static [&'static str],
}

impl Menu {
    pub const fn new(items: &'static [&'static str]) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &'static [&'static str] {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Map an encoder position to the selected index. Negative positions
    /// wrap backwards from the end of the list.
    pub fn selection(&self, position: i32) -> usize {
        if self.items.is_empty() {
            return 0;
        }
        position.rem_euclid(self.items.len() as i32) as usize
    }

    pub fn label(&self, position: i32) -> &'static str {
        if self.items.is_empty() {
            ""
        } else {
            self.items[self.selection(position)]
        }
    }
}

/// Horizontal scroll state for labels wider than the screen, advanced on
/// the settings-controlled cadence (ms per character step).
pub struct Marquee {
    step_ms: u32,
    elapsed_ms: u32,
    offset: usize,
}

impl Marquee {
    /// `step_ms` of 0 is clamped to 1 so the marquee always advances.
    pub const fn new(step_ms: u8) -> Self {
        Self {
            step_ms: if step_ms == 0 { 1 } else { step_ms as u32 },
            elapsed_ms: 0,
            offset: 0,
        }
    }

    pub fn reset(&mut self) {
        self.elapsed_ms = 0;
        self.offset = 0;
    }

    /// Account for `elapsed_ms` of wall time and return the current
    /// character offset for a label of `len` chars shown in a `window`-char
    /// viewport. Labels that fit never scroll.
    pub fn tick(&mut self, elapsed_ms: u32, len: usize, window: usize) -> usize {
        if len <= window || window == 0 {
            self.offset = 0;
            return 0;
        }
        self.elapsed_ms += elapsed_ms;
        let steps = self.elapsed_ms / self.step_ms;
        self.elapsed_ms %= self.step_ms;
        let span = len - window + 1;
        self.offset = (self.offset + steps as usize) % span;
        self.offset
    }
}

/// Compose the `width`-char window of `label` starting at `offset`.
/// Total: clamps rather than panics when the offset runs past the end.
pub fn window(label: &str, width: usize, offset: usize) -> String<MAX_LABEL> {
    let mut out = String::new();
    for c in label.chars().skip(offset).take(width.min(MAX_LABEL)) {
        let _ = out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMS: &[&str] = &["Analyzer", "Scanner", "BLE Scan", "WiFi Scan", "Settings"];

    #[test]
    fn selection_wraps_forward_and_backward() {
        let menu = Menu::new(ITEMS);
        assert_eq!(menu.selection(0), 0);
        assert_eq!(menu.selection(4), 4);
        assert_eq!(menu.selection(5), 0);
        assert_eq!(menu.selection(12), 2);
        assert_eq!(menu.selection(-1), 4);
        assert_eq!(menu.selection(-6), 4);
    }

    #[test]
    fn label_follows_selection() {
        let menu = Menu::new(ITEMS);
        assert_eq!(menu.label(1), "Scanner");
        assert_eq!(menu.label(-1), "Settings");
    }

    #[test]
    fn empty_menu_is_total() {
        let menu = Menu::new(&[]);
        assert_eq!(menu.selection(123), 0);
        assert_eq!(menu.label(-5), "");
    }

    #[test]
    fn short_labels_never_scroll() {
        let mut marquee = Marquee::new(150);
        assert_eq!(marquee.tick(10_000, 8, 16), 0);
    }

    #[test]
    fn marquee_advances_on_cadence_and_wraps() {
        let mut marquee = Marquee::new(100);
        // 20-char label in a 16-char window scrolls over 5 offsets.
        assert_eq!(marquee.tick(99, 20, 16), 0);
        assert_eq!(marquee.tick(1, 20, 16), 1);
        assert_eq!(marquee.tick(200, 20, 16), 3);
        assert_eq!(marquee.tick(200, 20, 16), 0); // wrapped past offset 4
    }

    #[test]
    fn marquee_zero_speed_is_clamped() {
        let mut marquee = Marquee::new(0);
        assert_eq!(marquee.tick(2, 20, 16), 2);
    }

    #[test]
    fn window_slices_and_clamps() {
        assert_eq!(window("Channel Analyzer", 7, 0).as_str(), "Channel");
        assert_eq!(window("Channel Analyzer", 8, 8).as_str(), "Analyzer");
        assert_eq!(window("abc", 8, 10).as_str(), "");
    }
}
