//! Environment abstraction for deterministic testing.
//!
//! Decouples identity generation from system entropy. Simulation uses a seeded
//! RNG so that generated user IDs are reproducible; production uses the OS RNG.

/// Abstract environment providing randomness.
///
/// # Invariants
///
/// - Given the same seed, a simulation environment produces the same sequence
///   of bytes
/// - Production implementations use OS entropy
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a random user ID: 28 characters from `[0-9A-Za-z]`.
    fn random_uid(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

        let mut bytes = [0u8; 28];
        self.random_bytes(&mut bytes);
        bytes.iter().map(|b| ALPHABET[usize::from(*b) % ALPHABET.len()] as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct CountingEnv;

    impl Environment for CountingEnv {
        fn random_bytes(&self, buffer: &mut [u8]) {
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = i as u8;
            }
        }
    }

    #[test]
    fn random_uid_is_alphanumeric() {
        let uid = CountingEnv.random_uid();
        assert_eq!(uid.len(), 28);
        assert!(uid.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(uid.starts_with("0123"));
    }

    #[test]
    fn random_u64_is_big_endian() {
        assert_eq!(CountingEnv.random_u64(), 0x0001_0203_0405_0607);
    }
}
