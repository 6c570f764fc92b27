use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
#[error("token verification failed: {0}")]
pub struct AuthError(#[from] jsonwebtoken::errors::Error);

/// Claims carried by the tokens the upstream auth system issues. Only the
/// signature and expiry matter here; the subject is kept for log context.
#[derive(Debug, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
}

/// Verifies a bearer token against the shared secret. The `exp` claim is
/// required and enforced; a bad token is terminal for the request.
pub fn verify(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
