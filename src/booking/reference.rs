// Booking reference generation

use rand::Rng;

/// Charset without lookalike characters, since guests read these back over
/// the phone.
const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const SUFFIX_LEN: usize = 8;

/// Generate a human-shareable booking reference, e.g. `HB-7KQ2MWP4`.
/// Uniqueness is enforced by the store on insert; collisions are
/// cryptographically improbable but handled by regenerating once.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("HB-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_shape() {
        let r = generate();
        assert_eq!(r.len(), 3 + SUFFIX_LEN);
        assert!(r.starts_with("HB-"));
        assert!(r[3..]
            .bytes()
            .all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn references_are_not_constant() {
        let a = generate();
        let mut distinct = false;
        for _ in 0..8 {
            if generate() != a {
                distinct = true;
                break;
            }
        }
        assert!(distinct);
    }
}
