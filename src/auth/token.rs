use rand::{distributions::Alphanumeric, Rng};

/// Opaque bearer tokens are longer than the password salt and generated once,
/// at account creation.
pub const TOKEN_LEN: usize = 64;

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
