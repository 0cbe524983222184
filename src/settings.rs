/// Persisted user settings over a byte-addressable non-volatile store.
///
/// Values are cached in RAM for fast reads; setters write through and
/// commit synchronously before returning, so a power cut after a setter
/// never loses the change. Every operation is total — the EEPROM-style
/// store has no failure path to surface.
use embedded_storage::Storage;

/// Byte-addressable non-volatile storage (EEPROM semantics).
pub trait NonVolatileStore {
    fn read_byte(&mut self, addr: usize) -> u8;
    fn write_byte(&mut self, addr: usize, value: u8);
    /// Flush pending writes to the medium; returns once they are durable.
    fn commit(&mut self);
}

impl<S: NonVolatileStore + ?Sized> NonVolatileStore for &mut S {
    fn read_byte(&mut self, addr: usize) -> u8 {
        (**self).read_byte(addr)
    }

    fn write_byte(&mut self, addr: usize, value: u8) {
        (**self).write_byte(addr, value)
    }

    fn commit(&mut self) {
        (**self).commit()
    }
}

/// Reserved store size in bytes — more than enough for the settings below.
pub const STORE_SIZE: usize = 16;

const BRIGHTNESS_ADDR: usize = 0;
const SCROLL_SPEED_ADDR: usize = 1;

pub const DEFAULT_BRIGHTNESS: u8 = 128;
pub const DEFAULT_SCROLL_SPEED_MS: u8 = 150;

/// Display/LED brightness and menu scroll speed, persisted across reboots.
pub struct Settings<S> {
    store: S,
    brightness: u8,
    scroll_speed_ms: u8,
}

impl<S: NonVolatileStore> Settings<S> {
    /// Load persisted values. A blank store reads 0x00 or 0xFF; the scroll
    /// speed treats both as "never written" and falls back to the default.
    pub fn load(mut store: S) -> Self {
        let brightness = store.read_byte(BRIGHTNESS_ADDR);
        let mut scroll_speed_ms = store.read_byte(SCROLL_SPEED_ADDR);
        if scroll_speed_ms == 0 || scroll_speed_ms == u8::MAX {
            scroll_speed_ms = DEFAULT_SCROLL_SPEED_MS;
        }
        Self {
            store,
            brightness,
            scroll_speed_ms,
        }
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Menu scroll speed in milliseconds per step.
    pub fn menu_scroll_speed(&self) -> u8 {
        self.scroll_speed_ms
    }

    pub fn set_brightness(&mut self, value: u8) {
        self.brightness = value;
        self.store.write_byte(BRIGHTNESS_ADDR, value);
        self.store.commit();
    }

    pub fn set_menu_scroll_speed(&mut self, ms: u8) {
        self.scroll_speed_ms = ms;
        self.store.write_byte(SCROLL_SPEED_ADDR, ms);
        self.store.commit();
    }
}

/// Fixed-offset settings block over an `embedded-storage` backend (the
/// on-device flash). The block is read once at construction; `write_byte`
/// mutates the RAM copy and `commit` programs the whole block back, so a
/// setter's write+commit pair costs one flash write.
pub struct BlockStore<S> {
    storage: S,
    offset: u32,
    block: [u8; STORE_SIZE],
}

impl<S: Storage> BlockStore<S> {
    /// A backend read failure leaves the block reading as erased flash, so
    /// the settings come up with their defaults.
    pub fn new(mut storage: S, offset: u32) -> Self {
        let mut block = [0xFF; STORE_SIZE];
        if storage.read(offset, &mut block).is_err() {
            block = [0xFF; STORE_SIZE];
        }
        Self {
            storage,
            offset,
            block,
        }
    }
}

impl<S: Storage> NonVolatileStore for BlockStore<S> {
    fn read_byte(&mut self, addr: usize) -> u8 {
        self.block.get(addr).copied().unwrap_or(0xFF)
    }

    fn write_byte(&mut self, addr: usize, value: u8) {
        if let Some(slot) = self.block.get_mut(addr) {
            *slot = value;
        }
    }

    fn commit(&mut self) {
        if self.storage.write(self.offset, &self.block).is_err() {
            log::error!("settings flash write failed");
        }
    }
}

/// RAM-backed store for host tests and boards without a wired flash
/// partition. Fresh instances read 0xFF everywhere, like erased flash.
pub struct RamStore {
    bytes: [u8; STORE_SIZE],
}

impl RamStore {
    pub const fn new() -> Self {
        Self {
            bytes: [0xFF; STORE_SIZE],
        }
    }
}

impl Default for RamStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NonVolatileStore for RamStore {
    fn read_byte(&mut self, addr: usize) -> u8 {
        self.bytes.get(addr).copied().unwrap_or(0xFF)
    }

    fn write_byte(&mut self, addr: usize, value: u8) {
        if let Some(slot) = self.bytes.get_mut(addr) {
            *slot = value;
        }
    }

    fn commit(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_storage::ReadStorage;
    use std::vec::Vec;

    /// RAM flash image shared across "power cycles" by reborrowing it into
    /// a fresh `BlockStore`.
    struct RamFlash<'a> {
        image: &'a mut [u8; 256],
    }

    impl ReadStorage for RamFlash<'_> {
        type Error = ();

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), ()> {
            let start = offset as usize;
            bytes.copy_from_slice(&self.image[start..start + bytes.len()]);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.image.len()
        }
    }

    impl Storage for RamFlash<'_> {
        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), ()> {
            let start = offset as usize;
            self.image[start..start + bytes.len()].copy_from_slice(bytes);
            Ok(())
        }
    }

    /// Store that records the order of writes and commits, to check the
    /// synchronous-persist contract.
    struct JournalStore {
        bytes: [u8; STORE_SIZE],
        journal: Vec<(usize, u8, bool)>, // (addr, value, committed-after)
        pending: bool,
    }

    impl JournalStore {
        fn new() -> Self {
            Self {
                bytes: [0xFF; STORE_SIZE],
                journal: Vec::new(),
                pending: false,
            }
        }
    }

    impl NonVolatileStore for JournalStore {
        fn read_byte(&mut self, addr: usize) -> u8 {
            self.bytes[addr]
        }

        fn write_byte(&mut self, addr: usize, value: u8) {
            self.bytes[addr] = value;
            self.journal.push((addr, value, false));
            self.pending = true;
        }

        fn commit(&mut self) {
            for entry in &mut self.journal {
                entry.2 = true;
            }
            self.pending = false;
        }
    }

    #[test]
    fn blank_store_yields_default_scroll_speed() {
        let settings = Settings::load(RamStore::new());
        assert_eq!(settings.menu_scroll_speed(), DEFAULT_SCROLL_SPEED_MS);
    }

    #[test]
    fn zero_scroll_speed_is_sanitized() {
        let mut store = RamStore::new();
        store.write_byte(SCROLL_SPEED_ADDR, 0);
        let settings = Settings::load(store);
        assert_eq!(settings.menu_scroll_speed(), DEFAULT_SCROLL_SPEED_MS);
    }

    #[test]
    fn setters_persist_before_returning() {
        let mut settings = Settings::load(JournalStore::new());
        settings.set_brightness(200);
        settings.set_menu_scroll_speed(75);

        assert_eq!(settings.brightness(), 200);
        assert_eq!(settings.menu_scroll_speed(), 75);

        let store = &settings.store;
        assert!(!store.pending, "commit must happen inside the setter");
        assert_eq!(
            store.journal,
            vec![(0usize, 200u8, true), (1usize, 75u8, true)]
        );
    }

    #[test]
    fn block_store_survives_a_power_cycle() {
        let mut image = [0xFF; 256];
        let offset = 32;
        {
            let store = BlockStore::new(RamFlash { image: &mut image }, offset);
            let mut settings = Settings::load(store);
            settings.set_brightness(64);
            settings.set_menu_scroll_speed(120);
        }
        let store = BlockStore::new(RamFlash { image: &mut image }, offset);
        let settings = Settings::load(store);
        assert_eq!(settings.brightness(), 64);
        assert_eq!(settings.menu_scroll_speed(), 120);
    }

    #[test]
    fn uncommitted_block_writes_are_not_durable() {
        let mut image = [0xFF; 256];
        {
            let mut store = BlockStore::new(RamFlash { image: &mut image }, 0);
            store.write_byte(0, 7);
        }
        let mut store = BlockStore::new(RamFlash { image: &mut image }, 0);
        assert_eq!(store.read_byte(0), 0xFF);
    }

    #[test]
    fn values_survive_a_reload() {
        let mut store = RamStore::new();
        {
            let mut settings = Settings::load(&mut store);
            settings.set_brightness(42);
            settings.set_menu_scroll_speed(90);
        }
        let settings = Settings::load(&mut store);
        assert_eq!(settings.brightness(), 42);
        assert_eq!(settings.menu_scroll_speed(), 90);
    }
}
