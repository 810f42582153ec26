/*
 * Generators and helpers shared by the integration tests.
 *
 */

use dune_wib_compress::codec::histogram::Histogram;
use dune_wib_compress::codec::symbols_from_adcs;
use dune_wib_compress::wib::{InputWord, SignalGenerator, WibFrameBuilder, WibId, FRAME_NWORDS};
use dune_wib_compress::{Adc, Symbol, ADC_MASK, MODULE_NCHANNELS, PACKET_NSAMPLES};
use rand::prelude::{Distribution, SmallRng};
use rand::{Rng, SeedableRng};
use rand_distr::{Normal, Zipf};

/// The identity every generated frame carries.
#[allow(dead_code)]
pub const TEST_WIB: WibId = WibId {
    crate_no: 4,
    slot: 2,
    fiber: 1,
};

#[allow(dead_code)]
/// A channel of `n` samples around `baseline` with gaussian noise of deviation `sigma`.
pub fn gaussian_channel(seed: u64, baseline: f64, sigma: f64, n: usize) -> Vec<Adc> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let noise = Normal::new(baseline, sigma).unwrap();
    (0..n)
        .map(|_| noise.sample(&mut rng).round().clamp(0.0, ADC_MASK as f64) as Adc)
        .collect()
}

#[allow(dead_code)]
/// A random walk of `n` samples whose step magnitudes follow a Zipf law with the given
/// exponent: mostly small steps and the occasional jump far outside the histogram range.
pub fn zipf_channel(seed: u64, exponent: f64, n: usize) -> Vec<Adc> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let steps = Zipf::new(ADC_MASK as u64, exponent).unwrap();
    let mut adc = rng.gen_range(0..=ADC_MASK as i32);
    (0..n)
        .map(|_| {
            let step = steps.sample(&mut rng) as i32 - 1;
            adc += if rng.gen_bool(0.5) { step } else { -step };
            adc = adc.rem_euclid(ADC_MASK as i32 + 1);
            adc as Adc
        })
        .collect()
}

#[allow(dead_code)]
/// The symbols of `adcs` and the histogram of their differences.
pub fn symbols_and_histogram(adcs: &[Adc], nbins: usize) -> (Vec<Symbol>, Histogram) {
    let syms = symbols_from_adcs(adcs);
    let mut hist = Histogram::new(nbins).unwrap();
    for sym in &syms[1..] {
        hist.bump(*sym).unwrap();
    }
    (syms, hist)
}

#[allow(dead_code)]
/// `nframes` frames of synthetic signal, as the samples that went in and the input stream.
pub fn signal_frames(
    seed: u64,
    nframes: usize,
) -> (Vec<[Adc; MODULE_NCHANNELS]>, Vec<[InputWord; FRAME_NWORDS]>) {
    let mut generator = SignalGenerator::new(seed, 2.5, 0.002).unwrap();
    let mut builder = WibFrameBuilder::new(TEST_WIB).with_timestamp(0x1234_5678);
    let adcs = (0..nframes).map(|_| generator.next_adcs()).collect::<Vec<_>>();
    let frames = adcs.iter().map(|adcs| builder.build(adcs)).collect();
    (adcs, frames)
}

#[allow(dead_code)]
/// The samples of channel `ichan` across `frames`.
pub fn channel(adcs: &[[Adc; MODULE_NCHANNELS]], ichan: usize) -> Vec<Adc> {
    adcs.iter().map(|frame| frame[ichan]).collect()
}

#[allow(dead_code)]
pub const FULL_PACKET: usize = PACKET_NSAMPLES;
