use std::ops::Neg;

pub mod bits;

/// Shannon entropy, in bits per symbol, of the distribution described by `distr`.
pub fn entropy(distr: &[u32], total_freq: f64) -> f64 {
    let mut entropy = 0.0;

    for freq in distr.iter().filter(|freq| **freq > 0) {
        let pr = *freq as f64 / total_freq;
        entropy += pr * f64::log2(pr);
    }
    entropy.neg()
}
