use jsonwebtoken::errors::Error;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::configs::Auth;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub sub: String,
    pub token: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Owner of the tasks created with this token
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Clone)]
pub struct TokenService {
    expiration: u64,
    secret: String,
}

impl TokenService {
    pub fn new(auth: Auth) -> Self {
        Self {
            expiration: auth.expiration,
            secret: auth.secret,
        }
    }

    pub fn retrieve_token_claims(&self, token: &str) -> Result<TokenData<TokenClaims>, Error> {
        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
    }

    pub fn generate_token(&self, user_id: &str) -> Result<Token, Error> {
        let iat = OffsetDateTime::now_utc().unix_timestamp().max(0) as u64;
        let exp = iat + self.expiration;

        let claims = TokenClaims {
            sub: user_id.to_string(),
            iat,
            exp,
        };

        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_ref()))?;

        Ok(Token {
            sub: claims.sub,
            token,
            iat,
            exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_service(secret: &str) -> TokenService {
        TokenService::new(Auth {
            secret: String::from(secret),
            expiration: 1000,
        })
    }

    #[test]
    fn test_generate_and_retrieve_token() {
        let token_service = token_service("test");

        let token = token_service.generate_token("alice").unwrap();
        let claims = token_service.retrieve_token_claims(&token.token).unwrap().claims;

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp, claims.iat + 1000);
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let token = token_service("other").generate_token("alice").unwrap();

        assert!(token_service("test").retrieve_token_claims(&token.token).is_err());
    }
}
