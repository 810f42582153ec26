use anyhow::{Context, Result};
use rand::prelude::{Distribution, SmallRng};
use rand::{Rng, SeedableRng};
use rand_distr::{Normal, Zipf};

use crate::{Adc, ADC_MASK, MODULE_NCHANNELS};

/// Largest amplitude of a pulse.
const MAX_PULSE: u64 = 1 << 11;

/// Synthetic detector samples: a per-channel baseline with gaussian noise, plus sparse pulses
/// whose amplitudes follow a Zipf law and decay over a few samples.
#[derive(Clone, Debug)]
pub struct SignalGenerator {
    rng: SmallRng,
    baselines: [f64; MODULE_NCHANNELS],
    noise: Normal<f64>,
    pulses: Zipf<f64>,
    pulse_rate: f64,
    /// Residual pulse amplitude of each channel.
    tails: [f64; MODULE_NCHANNELS],
}

impl SignalGenerator {
    /// A generator whose noise has standard deviation `sigma` and where every channel starts a
    /// pulse with probability `pulse_rate` at every sample.
    pub fn new(seed: u64, sigma: f64, pulse_rate: f64) -> Result<Self> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut baselines = [0.0; MODULE_NCHANNELS];
        for baseline in baselines.iter_mut() {
            *baseline = rng.gen_range(0x300 as f64..0xA00 as f64);
        }
        Ok(Self {
            rng,
            baselines,
            noise: Normal::new(0.0, sigma).context("Invalid noise level")?,
            pulses: Zipf::new(MAX_PULSE, 1.2).context("Invalid pulse distribution")?,
            pulse_rate: pulse_rate.clamp(0.0, 1.0),
            tails: [0.0; MODULE_NCHANNELS],
        })
    }

    /// The samples of the next frame.
    pub fn next_adcs(&mut self) -> [Adc; MODULE_NCHANNELS] {
        let mut adcs = [0; MODULE_NCHANNELS];
        for ichan in 0..MODULE_NCHANNELS {
            if self.rng.gen_bool(self.pulse_rate) {
                self.tails[ichan] += self.pulses.sample(&mut self.rng);
            }
            let value = self.baselines[ichan] + self.tails[ichan] + self.noise.sample(&mut self.rng);
            self.tails[ichan] *= 0.6;
            adcs[ichan] = value.round().clamp(0.0, ADC_MASK as f64) as Adc;
        }
        adcs
    }
}
