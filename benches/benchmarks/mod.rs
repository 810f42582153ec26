use dune_wib_compress::wib::SignalGenerator;
use dune_wib_compress::{Adc, MODULE_NCHANNELS, PACKET_NSAMPLES};

pub mod decoder;
pub mod encoder;
pub mod packet;

/// Noise deviation of the synthetic channels.
const SIGMA: f64 = 3.0;

/// Probability of a pulse starting on a channel at any given sample.
const PULSE_RATE: f64 = 0.001;

/// Number of bins used when nothing else is being measured.
const NBINS: usize = 32;

/// A full packet of synthetic samples, one vector per channel.
pub fn get_channels() -> Vec<Vec<Adc>> {
    let mut generator = SignalGenerator::new(0, SIGMA, PULSE_RATE).unwrap();
    let mut channels = vec![Vec::with_capacity(PACKET_NSAMPLES); MODULE_NCHANNELS];
    for _ in 0..PACKET_NSAMPLES {
        for (channel, adc) in channels.iter_mut().zip(generator.next_adcs()) {
            channel.push(adc);
        }
    }
    channels
}

/// Keeps the benchmark off core 0.
pub fn pin_to_core() {
    if let Some(core_ids) = core_affinity::get_core_ids() {
        let core_id = core_ids[1 % core_ids.len()];
        if !core_affinity::set_for_current(core_id) {
            eprintln!("Cannot pin thread to core {:?}", core_id);
        }
    } else {
        eprintln!("Cannot retrieve core ids");
    }
}
