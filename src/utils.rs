use sha2::{Digest, Sha256};

pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub fn verify_password(salt: &str, password: &str, stored_hash: &str) -> bool {
    constant_time_eq(
        hash_password(salt, password).as_bytes(),
        stored_hash.as_bytes(),
    )
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn format_eur(cents: i64) -> String {
    format!("{}.{:02}€", cents / 100, cents % 100)
}
