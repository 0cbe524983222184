/// Radio-module scheduling contract and the channel analyzer bookkeeping.
///
/// Each radio module exposes a setup/poll pair driven by the outer
/// scheduler. A `poll()` must stay within a small bounded duration (tens of
/// milliseconds) so button and encoder input remain responsive — hence the
/// one-channel-per-poll sweep below. The radio protocols themselves live
/// behind the [`RadioProbe`] boundary and are not implemented here.

/// A selectable mode with a setup/poll lifecycle.
pub trait Activity {
    /// Label for the activity screen.
    fn label(&self) -> &'static str;
    /// One-time initialization when the activity is entered.
    fn setup(&mut self);
    /// One bounded slice of work; called repeatedly while active.
    fn poll(&mut self);
}

/// Register-level carrier probe (nRF24 RPD boundary): tune to a channel,
/// report whether received power exceeds the detect threshold.
pub trait RadioProbe {
    fn set_channel(&mut self, channel: u8);
    fn carrier_detected(&mut self) -> bool;
}

/// Channels the 2.4 GHz probe can tune.
pub const NUM_CHANNELS: usize = 128;

/// Channel occupancy sweep: probes one channel per poll, records whether a
/// carrier was present, and wraps back to channel 0 after the last.
pub struct ChannelSweep<P> {
    probe: P,
    occupancy: [bool; NUM_CHANNELS],
    channel: usize,
}

impl<P: RadioProbe> ChannelSweep<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            occupancy: [false; NUM_CHANNELS],
            channel: 0,
        }
    }

    /// Latest occupancy snapshot, indexed by channel.
    pub fn occupancy(&self) -> &[bool; NUM_CHANNELS] {
        &self.occupancy
    }

    /// The channel the next poll will probe.
    pub fn current_channel(&self) -> usize {
        self.channel
    }

    /// Hand the probe back, e.g. when leaving the activity.
    pub fn release(self) -> P {
        self.probe
    }
}

impl<P: RadioProbe> Activity for ChannelSweep<P> {
    fn label(&self) -> &'static str {
        "Analyzer"
    }

    fn setup(&mut self) {
        self.occupancy = [false; NUM_CHANNELS];
        self.channel = 0;
    }

    fn poll(&mut self) {
        self.probe.set_channel(self.channel as u8);
        self.occupancy[self.channel] = self.probe.carrier_detected();
        self.channel = (self.channel + 1) % NUM_CHANNELS;
    }
}

/// Signal-strength survey: sweeps the band over and over, accumulating a
/// saturating hit count per channel. Busier channels climb faster, giving a
/// coarse histogram of 2.4 GHz occupancy over time.
pub struct SignalScan<P> {
    probe: P,
    hits: [u8; NUM_CHANNELS],
    channel: usize,
}

impl<P: RadioProbe> SignalScan<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            hits: [0; NUM_CHANNELS],
            channel: 0,
        }
    }

    /// Accumulated hit counts, indexed by channel.
    pub fn hits(&self) -> &[u8; NUM_CHANNELS] {
        &self.hits
    }

    pub fn current_channel(&self) -> usize {
        self.channel
    }

    pub fn release(self) -> P {
        self.probe
    }
}

impl<P: RadioProbe> Activity for SignalScan<P> {
    fn label(&self) -> &'static str {
        "Scanner"
    }

    fn setup(&mut self) {
        self.hits = [0; NUM_CHANNELS];
        self.channel = 0;
    }

    fn poll(&mut self) {
        self.probe.set_channel(self.channel as u8);
        if self.probe.carrier_detected() {
            self.hits[self.channel] = self.hits[self.channel].saturating_add(1);
        }
        self.channel = (self.channel + 1) % NUM_CHANNELS;
    }
}
