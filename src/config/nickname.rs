//! Random nickname generator.
//!
//! Produces nicknames in the format `CrabNNNN` (e.g. `Crab4821`), used as
//! the default nick when the config has none and as the fallback when the
//! server rejects ours.

use rand::RngExt;

const PREFIX: &str = "Crab";

/// Generate a random nickname like `Crab4821` (max 8 chars fits IRC limits).
pub fn generate_nickname() -> String {
    let mut rng = rand::rng();
    let num: u16 = rng.random_range(0..10000);
    format!("{}{}", PREFIX, num)
}

/// Generate a nickname that matches none of `avoid` (ignoring ASCII case).
pub fn generate_nickname_avoiding(avoid: &[&str]) -> String {
    loop {
        let nick = generate_nickname();
        if !avoid.iter().any(|a| a.eq_ignore_ascii_case(&nick)) {
            return nick;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_nickname_shape() {
        for _ in 0..100 {
            let nick = generate_nickname();
            let digits = nick.strip_prefix(PREFIX).unwrap();
            assert!(!digits.is_empty() && digits.len() <= 4);
            assert!(digits.parse::<u16>().unwrap() < 10000);
        }
    }

    #[test]
    fn test_generate_nickname_avoiding() {
        for _ in 0..100 {
            let first = generate_nickname();
            let second = generate_nickname_avoiding(&[&first, "crab1"]);
            assert!(!second.eq_ignore_ascii_case(&first));
            assert!(!second.eq_ignore_ascii_case("crab1"));
        }
    }
}
