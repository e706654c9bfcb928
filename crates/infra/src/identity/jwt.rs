use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};

use portal_auth::{IdentityError, JwtClaims, TokenValidationError, validate_claims};

/// HS256 token minting and verification.
///
/// Verification checks the signature first, then the claim time window
/// against the supplied clock.
pub struct Hs256Signer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256Signer {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` against an explicit clock.
        validation.validate_exp = false;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn sign(&self, claims: &JwtClaims) -> Result<String, IdentityError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| IdentityError::Unavailable(format!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, IdentityError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::Expired,
                _ => IdentityError::InvalidToken,
            })?;

        validate_claims(&data.claims, now).map_err(|e| match e {
            TokenValidationError::Expired => IdentityError::Expired,
            TokenValidationError::NotYetValid | TokenValidationError::InvalidTimeWindow => {
                IdentityError::InvalidToken
            }
        })?;

        Ok(data.claims)
    }
}
