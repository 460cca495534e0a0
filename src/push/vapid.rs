use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use chrono::Local;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use p256::{
    elliptic_curve::sec1::ToEncodedPoint, pkcs8::EncodePrivateKey, SecretKey,
};
use url::Url;

use crate::{configuration::Config, error::Error, types::Claims};

const TOKEN_TTL: i64 = 12 * 60 * 60;

/// Server identity for the VAPID scheme: the base64url public key handed to
/// browsers and the ES256 key signing every push request.
#[derive(Clone)]
pub struct VapidKeys {
    public_key: String,
    encoding_key: EncodingKey,
    contact: String,
}

impl fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key", &self.public_key)
            .field("contact", &self.contact)
            .finish_non_exhaustive()
    }
}

impl VapidKeys {
    /// `None` when either key is unset. A key pair that is set but unusable is
    /// a configuration error.
    pub fn from_config(config: &Config) -> Result<Option<VapidKeys>, Error> {
        if !config.has_vapid() {
            return Ok(None);
        }

        let keys = VapidKeys::new(
            &config.vapid_public_key,
            &config.vapid_private_key,
            &config.vapid_contact,
        )?;

        Ok(Some(keys))
    }

    pub fn new(
        public_key: &str,
        private_key: &str,
        contact: &str,
    ) -> Result<VapidKeys, Error> {
        let public_key = public_key.trim().trim_end_matches('=');
        let public = BASE64_URL.decode(public_key)?;
        let private = BASE64_URL.decode(private_key.trim().trim_end_matches('='))?;

        if public.len() != 65 || public[0] != 0x04 {
            return Err(Error::ConfigurationError(String::from(
                "VAPID public key must be an uncompressed P-256 point",
            )));
        }

        if private.len() != 32 {
            return Err(Error::ConfigurationError(String::from(
                "VAPID private key must be a 32 byte P-256 scalar",
            )));
        }

        let secret = SecretKey::from_slice(&private)?;

        let derived = secret.public_key().to_encoded_point(false);
        if derived.as_bytes() != public.as_slice() {
            return Err(Error::ConfigurationError(String::from(
                "VAPID public key does not belong to the private key",
            )));
        }

        let der = secret.to_pkcs8_der()?;

        let contact = if contact.starts_with("mailto:")
            || contact.starts_with("https:")
        {
            contact.to_owned()
        } else {
            format!("mailto:{}", contact)
        };

        Ok(VapidKeys {
            public_key: public_key.to_owned(),
            encoding_key: EncodingKey::from_ec_der(der.as_bytes()),
            contact,
        })
    }

    pub fn sign(&self, audience: &str) -> Result<String, Error> {
        let exp = Local::now().timestamp_millis() / 1000 + TOKEN_TTL;
        let claims = Claims {
            aud: audience.to_owned(),
            sub: self.contact.to_owned(),
            exp,
        };

        let token =
            encode(&Header::new(Algorithm::ES256), &claims, &self.encoding_key)?;

        Ok(token)
    }

    /// `Authorization` header value for a request to `endpoint`.
    pub fn authorization(&self, endpoint: &str) -> Result<String, Error> {
        let url = Url::parse(endpoint)?;

        if url.host().is_none() {
            return Err(Error::InvalidOption {
                option: String::from("host"),
            });
        }

        let audience = url.origin().ascii_serialization();
        let token = self.sign(&audience)?;

        Ok(format!("vapid t={}, k={}", token, self.public_key))
    }
}
