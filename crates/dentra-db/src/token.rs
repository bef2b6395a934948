use rand::RngCore;
use rand::rngs::OsRng;

/// Bytes of entropy in a password-reset token.
pub const TOKEN_BYTES: usize = 32;

/// Generates an opaque token: 32 bytes from the OS CSPRNG, hex-encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
