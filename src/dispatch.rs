/// Interrupt dispatch: a fixed-capacity registry mapping interrupt lines to
/// encoder instances, and the entry points that route edge events to them.
///
/// Some platforms share one GPIO vector across every pin and cannot report
/// which pin fired. Dispatch therefore accepts either an exact line (targeted
/// lookup) or an unknown origin, in which case every populated slot is
/// scanned — wasted work traded for correctness, and safe because a decoder
/// update with unchanged pin levels is a no-op.
use core::cell::RefCell;

use critical_section::Mutex;

use crate::board;

/// Receiver of edge events, invoked from interrupt context.
///
/// Implementations must complete in bounded, short time and never block.
pub trait EdgeSink: Sync {
    fn on_edge(&self);
}

/// Where an edge event came from, as far as the hardware can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOrigin {
    /// The vector identified the firing interrupt line.
    Line(u8),
    /// Shared vector, firing line unknown — scan all registered instances.
    Unknown,
}

/// Process-wide table with one slot per interrupt line the target hardware
/// exposes (`N` is the platform constant, e.g. [`board::INTERRUPT_LINES`]).
///
/// Slots hold non-owning references: the table records where to find an
/// instance, never manages its lifetime. Populated incrementally during
/// construction, read-only afterwards; there is no removal. The lifetime
/// parameter lets tests inject a local table with local sinks — firmware
/// uses a single `'static` definition.
pub struct DispatchTable<'a, const N: usize> {
    slots: Mutex<RefCell<[Option<&'a dyn EdgeSink>; N]>>,
}

impl<'a, const N: usize> DispatchTable<'a, N> {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new([None; N])),
        }
    }

    /// Record `sink` at slot `line`. Returns `false` (non-fatal, logged) if
    /// the line is outside the table — the caller keeps a degraded but
    /// functional instance that simply receives no edges from that line.
    ///
    /// Registering two sinks on one line is a wiring error the design does
    /// not detect; the last registration wins.
    pub fn register(&self, line: u8, sink: &'a dyn EdgeSink) -> bool {
        if line as usize >= N {
            log::warn!("interrupt line {} out of range ({} slots), not registered", line, N);
            return false;
        }
        critical_section::with(|cs| {
            self.slots.borrow_ref_mut(cs)[line as usize] = Some(sink);
        });
        true
    }

    /// Register `sink` under both of its pins' interrupt lines.
    ///
    /// A pin the platform reports interrupt-incapable is skipped silently;
    /// one working pin still yields usable (half-resolution) edge delivery.
    pub fn attach_pins(&self, sink: &'a dyn EdgeSink, pin_a: u8, pin_b: u8) {
        for pin in [pin_a, pin_b] {
            match board::interrupt_line(pin) {
                Some(line) => {
                    self.register(line, sink);
                }
                None => log::warn!("pin {} has no interrupt capability, edges ignored", pin),
            }
        }
    }

    /// The sink registered at `line`, if any.
    pub fn lookup(&self, line: u8) -> Option<&'a dyn EdgeSink> {
        if line as usize >= N {
            return None;
        }
        critical_section::with(|cs| self.slots.borrow_ref(cs)[line as usize])
    }

    /// Interrupt entry point: route one hardware edge event.
    ///
    /// The slot array is snapshotted inside one short critical section and
    /// the sinks invoked outside it, keeping the masked window bounded. A
    /// sink registered under two lines is invoked once per slot on an
    /// `Unknown` scan; the extra invocation resamples unchanged levels and
    /// applies a zero delta, so no physical edge is double-counted.
    pub fn dispatch_edge(&self, origin: EdgeOrigin) {
        match origin {
            EdgeOrigin::Line(line) => {
                if let Some(sink) = self.lookup(line) {
                    sink.on_edge();
                }
            }
            EdgeOrigin::Unknown => {
                let snapshot = critical_section::with(|cs| *self.slots.borrow_ref(cs));
                for sink in snapshot.into_iter().flatten() {
                    sink.on_edge();
                }
            }
        }
    }
}

impl<const N: usize> Default for DispatchTable<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}
