use rand::RngCore;

/// Bytes of randomness behind each session token.
const TOKEN_BYTES: usize = 32;

/// Generate a fresh bearer token: 32 random bytes, URL-safe base64 without
/// padding. Unguessable, safe to carry in headers and query strings.
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64_simd::URL_SAFE_NO_PAD.encode_to_string(bytes)
}
