use crate::dsp::filter::PeakingFilter;

/// Largest boost or cut per band, in dB.
pub const MAX_BAND_GAIN_DB: f32 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqBand {
    Low,
    Mid,
    High,
}

impl EqBand {
    pub const ALL: [EqBand; 3] = [EqBand::Low, EqBand::Mid, EqBand::High];

    /// Frequency span of the band in Hz.
    pub fn range(&self) -> (f32, f32) {
        match self {
            EqBand::Low => (0.0, 400.0),
            EqBand::Mid => (400.0, 4_000.0),
            EqBand::High => (4_000.0, 14_000.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EqBand::Low => "low",
            EqBand::Mid => "mid",
            EqBand::High => "high",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Three peaking bands in series followed by a balance gain.
///
/// Boosting a band makes the whole mix louder, so the balance gain pulls the
/// level back down: `1 / (1 + sum(boost_db / 24))` over the boosted bands.
/// Cuts are left alone.
#[derive(Debug, Clone)]
pub struct Equalizer {
    bands: [PeakingFilter; 3],
    balance: f32,
}

impl Equalizer {
    pub fn new(sample_rate: f32) -> Self {
        let band = |band: EqBand| {
            let (low, high) = band.range();
            PeakingFilter::for_band(sample_rate, low, high)
        };
        Self {
            bands: [band(EqBand::Low), band(EqBand::Mid), band(EqBand::High)],
            balance: 1.0,
        }
    }

    pub fn set_band(&mut self, band: EqBand, gain_db: f32) {
        let gain_db = gain_db.clamp(-MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB);
        self.bands[band.index()].set_gain_db(gain_db);
        self.rebalance();
    }

    pub fn band(&self, band: EqBand) -> f32 {
        self.bands[band.index()].gain_db()
    }

    pub fn balance(&self) -> f32 {
        self.balance
    }

    fn rebalance(&mut self) {
        let mix: f32 = 1.0
            + self
                .bands
                .iter()
                .map(|f| f.gain_db())
                .filter(|gain| *gain > 0.0)
                .map(|gain| gain / MAX_BAND_GAIN_DB)
                .sum::<f32>();
        self.balance = 1.0 / mix;
    }

    pub fn process(&mut self, buffer: &mut [f32]) {
        for filter in &mut self.bands {
            filter.process(buffer);
        }
        if self.balance != 1.0 {
            for sample in buffer.iter_mut() {
                *sample *= self.balance;
            }
        }
    }
}
