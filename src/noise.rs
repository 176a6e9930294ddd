//! Deterministic hash noise for agent steering.
//!
//! Agents that face a trough need a coin flip that is reproducible: the same
//! position and heading must always turn the same way. The hash is an
//! integer bit mixer applied to the raw bits of the inputs.

/// Stream selector for [`hash_noise`]. Distinct salts give uncorrelated values
/// for the same agent state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoiseStream {
    /// Left/right choice when both side probes beat the forward probe.
    Steering,
    /// Scatter distance for agents spawned along the pointer path.
    SpawnJitter,
}

impl NoiseStream {
    const fn salt(self) -> u32 {
        match self {
            NoiseStream::Steering => 0x9e37_79b9,
            NoiseStream::SpawnJitter => 0x85eb_ca6b,
        }
    }
}

/// 32-bit integer hash.
#[inline]
pub fn hash(n: u32) -> u32 {
    let mut x = n;
    x ^= x >> 17;
    x = x.wrapping_mul(0xed5a_d4bb);
    x ^= x >> 11;
    x = x.wrapping_mul(0xac4c_1b51);
    x ^= x >> 15;
    x = x.wrapping_mul(0x3184_8bab);
    x ^= x >> 14;
    x
}

#[inline]
pub fn hash3(a: u32, b: u32, c: u32) -> u32 {
    hash(a.wrapping_add(hash(b.wrapping_add(hash(c)))))
}

/// Uniform value in `[0, 1)` derived from an agent's position and heading.
///
/// `-0.0` and `0.0` hash alike.
#[inline]
pub fn hash_noise(x: f32, y: f32, heading: f32, stream: NoiseStream) -> f32 {
    let bits = |v: f32| (v + 0.0).to_bits();
    let h = hash3(bits(x), bits(y) ^ stream.salt(), bits(heading));
    // Top 24 bits fit exactly in an f32 mantissa.
    (h >> 8) as f32 / (1u32 << 24) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_deterministic() {
        let a = hash_noise(0.25, -0.5, 1.3, NoiseStream::Steering);
        let b = hash_noise(0.25, -0.5, 1.3, NoiseStream::Steering);
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_range() {
        for i in 0..10_000u32 {
            let x = (i as f32 * 0.37).sin();
            let y = (i as f32 * 0.11).cos();
            let v = hash_noise(x, y, i as f32 * 0.01, NoiseStream::Steering);
            assert!((0.0..1.0).contains(&v), "noise {} out of range", v);
        }
    }

    #[test]
    fn test_noise_is_roughly_uniform() {
        let mut buckets = [0u32; 10];
        let n = 20_000u32;
        for i in 0..n {
            let x = (i % 200) as f32 / 100.0 - 1.0;
            let y = (i / 200) as f32 / 100.0 - 1.0;
            let v = hash_noise(x, y, 0.5, NoiseStream::Steering);
            buckets[(v * 10.0) as usize] += 1;
        }
        let expected = n / 10;
        for count in buckets {
            assert!(count > expected * 8 / 10 && count < expected * 12 / 10);
        }
    }

    #[test]
    fn test_streams_differ() {
        let mut same = 0;
        for i in 0..100 {
            let x = i as f32 * 0.01;
            let a = hash_noise(x, 0.3, 2.0, NoiseStream::Steering);
            let b = hash_noise(x, 0.3, 2.0, NoiseStream::SpawnJitter);
            if a == b {
                same += 1;
            }
        }
        assert!(same < 5);
    }

    #[test]
    fn test_signed_zero_hashes_alike() {
        assert_eq!(
            hash_noise(0.0, 0.0, 0.0, NoiseStream::Steering),
            hash_noise(-0.0, -0.0, -0.0, NoiseStream::Steering)
        );
    }
}
