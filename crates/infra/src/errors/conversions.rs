//! Conversions from external infrastructure errors into domain errors.

use esi_domain::EsiError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub EsiError);

impl From<InfraError> for EsiError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<EsiError> for InfraError {
    fn from(value: EsiError) -> Self {
        Self(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoEsiError {
    fn into_esi(self) -> EsiError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → EsiError */
/* -------------------------------------------------------------------------- */

impl IntoEsiError for HttpError {
    fn into_esi(self) -> EsiError {
        if self.is_timeout() {
            return EsiError::Transport("HTTP request timed out".into());
        }

        if self.is_connect() {
            return EsiError::Transport(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return EsiError::InvalidParameter(format!("cannot build HTTP request: {self}"));
        }

        if self.is_decode() {
            return EsiError::Serialization(format!("cannot decode HTTP response: {self}"));
        }

        if let Some(status) = self.status() {
            return EsiError::HttpStatus { status: status.as_u16(), body: self.to_string() };
        }

        EsiError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_esi())
    }
}

/* -------------------------------------------------------------------------- */
/* toml / serde_json → EsiError */
/* -------------------------------------------------------------------------- */

impl IntoEsiError for toml::de::Error {
    fn into_esi(self) -> EsiError {
        EsiError::Config(format!("Invalid TOML format: {}", self.message()))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        Self(value.into_esi())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn connection_refused_maps_to_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new().get(format!("http://{addr}")).send().await.unwrap_err();
        let esi: EsiError = InfraError::from(err).into();
        assert!(matches!(esi, EsiError::Transport(msg) if msg.contains("connection")));
    }

    #[test]
    fn toml_errors_map_to_config() {
        let err = toml::from_str::<toml::Value>("not = [valid").unwrap_err();
        let esi: EsiError = InfraError::from(err).into();
        assert!(matches!(esi, EsiError::Config(msg) if msg.starts_with("Invalid TOML")));
    }
}
