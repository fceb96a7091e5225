use std::future::Future;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, TokenData, Validation};
use secrecy::{ExposeSecret as _, SecretString};
use tracing::instrument;

use crate::prelude::*;

/// Turns a bearer token into the identity of the user it was issued to.
pub trait IdentityProvider {
    fn validate_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<UserIdentity, AuthError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, new)]
pub struct Claims {
    pub email: String,
    pub exp: i64,
}

impl Claims {
    pub fn expiring_in(email: impl Into<String>, lifetime: Duration) -> Self {
        Self::new(email.into(), (Utc::now() + lifetime).timestamp())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AuthError {
    #[snafu(display("request is not authenticated"))]
    MissingToken {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to decode JWT token"))]
    Decode {
        source: jsonwebtoken::errors::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to encode JWT token"))]
    Encode {
        source: jsonwebtoken::errors::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("no user is registered under '{email}'"))]
    UnknownUser {
        email: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to look up user '{email}'"))]
    Lookup {
        email: String,
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    pub secret: SecretString,
    pub algorithm: Algorithm,
    pub validation: Validation,

    pub db: Database,
}

impl Authenticator {
    pub fn new(secret: SecretString, algorithm: Algorithm, db: Database) -> Self {
        Self {
            secret,
            algorithm,
            validation: Validation::new(algorithm),
            db,
        }
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.expose_secret().as_ref())
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.expose_secret().as_ref())
    }

    fn header(&self) -> jsonwebtoken::Header {
        jsonwebtoken::Header::new(self.algorithm)
    }

    pub fn decode(&self, token: &str) -> Result<TokenData<Claims>, AuthError> {
        jsonwebtoken::decode(token, &self.decoding_key(), &self.validation).context(DecodeSnafu)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&self.header(), claims, &self.encoding_key()).context(EncodeSnafu)
    }

    #[instrument(skip(self))]
    pub async fn user_by_email(&self, email: &str) -> Result<Option<UserIdentity>, DatabaseError> {
        self.db
            .sql("SELECT meta::id(id) AS id, email, role ?? 'user' AS role FROM users WHERE email = $email LIMIT 1")
            .bind(("email", email))
            .fetch_first()
            .await
    }
}

impl IdentityProvider for Authenticator {
    #[instrument(skip_all)]
    async fn validate_token(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let claims = self.decode(token)?.claims;
        let email = claims.email;

        self.user_by_email(&email)
            .await
            .context(LookupSnafu { email: &email })?
            .context(UnknownUserSnafu { email })
    }
}
