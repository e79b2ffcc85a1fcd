// src/sensor/simulation.rs
use rand::Rng;

const SAMPLE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
pub const SAMPLE_LEN: usize = 64;

/// Random base64-alphabet sample standing in for a device template.
pub fn generate_simulated_sample() -> String {
    let mut rng = rand::thread_rng();
    (0..SAMPLE_LEN)
        .map(|_| SAMPLE_ALPHABET[rng.gen_range(0..SAMPLE_ALPHABET.len())] as char)
        .collect()
}
