use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_expiry: Duration,
    refresh_expiry: Duration,
}

impl JwtService {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            access_expiry: Duration::minutes(config.jwt_expiry_minutes),
            refresh_expiry: Duration::days(config.refresh_token_expiry_days),
        })
    }

    pub fn access_expiry_seconds(&self) -> i64 {
        self.access_expiry.num_seconds()
    }

    pub fn generate_access_token(&self, user: &User) -> Result<String> {
        self.generate(user, TokenKind::Access, self.access_expiry)
    }

    pub fn generate_refresh_token(&self, user: &User) -> Result<String> {
        self.generate(user, TokenKind::Refresh, self.refresh_expiry)
    }

    fn generate(&self, user: &User, kind: TokenKind, lifetime: Duration) -> Result<String> {
        let now = Utc::now();
        let exp = now + lifetime;
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            kind,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp().max(0) as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.set_audience(&[self.audience.clone()]);
        validation.set_issuer(&[self.issuer.clone()]);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// Verifies the token and requires it to be of `kind`.
    pub fn verify_kind(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        let claims = self.verify_token(token)?;
        if claims.kind != kind {
            return Err(ErrorKind::InvalidToken.into());
        }
        Ok(claims)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub kind: TokenKind,
    pub iss: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}
