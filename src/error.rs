//! Error types and handling for `TravelETA`

use thiserror::Error;

/// Main error type for the `TravelETA` library
#[derive(Error, Debug)]
pub enum TravelEtaError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Remote provider communication errors (weather, routing, geolocation lookup)
    #[error("API error: {message}")]
    Api { message: String },

    /// A location label that is neither a known node nor a coordinate literal
    #[error("Invalid node: '{label}'")]
    InvalidNode { label: String },

    /// The routing provider answered with zero candidate routes
    #[error("Route not found: {message}")]
    RouteNotFound { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Device location could not be obtained
    #[error("Geolocation error: {message}")]
    Geolocation { message: String },

    /// No device location source is available
    #[error("Geolocation is not supported")]
    GeolocationUnsupported,

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TravelEtaError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn invalid_node<S: Into<String>>(label: S) -> Self {
        Self::InvalidNode {
            label: label.into(),
        }
    }

    pub fn route_not_found<S: Into<String>>(message: S) -> Self {
        Self::RouteNotFound {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn geolocation<S: Into<String>>(message: S) -> Self {
        Self::Geolocation {
            message: message.into(),
        }
    }

    /// Whether the error stems from user input rather than a remote service
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TravelEtaError::InvalidNode { .. } | TravelEtaError::Validation { .. }
        )
    }

    /// Get the alert text shown to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TravelEtaError::Config { .. } => {
                "Error de configuración. Revise el archivo de configuración.".to_string()
            }
            TravelEtaError::Api { .. } => {
                "No se pudo conectar con los servicios externos.".to_string()
            }
            TravelEtaError::InvalidNode { .. } => "Por favor, ingrese nodos válidos".to_string(),
            TravelEtaError::RouteNotFound { .. } => "No se pudo calcular la distancia.".to_string(),
            TravelEtaError::Validation { message } => format!("Entrada inválida: {message}"),
            TravelEtaError::Geolocation { .. } => {
                "No se pudo obtener la ubicación. Asegúrate de que la ubicación está habilitada."
                    .to_string()
            }
            TravelEtaError::GeolocationUnsupported => {
                "La geolocalización no es compatible con este dispositivo.".to_string()
            }
            TravelEtaError::Io { .. } => "Falló una operación de archivo.".to_string(),
        }
    }
}

impl From<reqwest::Error> for TravelEtaError {
    fn from(err: reqwest::Error) -> Self {
        TravelEtaError::api(err.to_string())
    }
}

impl From<serde_json::Error> for TravelEtaError {
    fn from(err: serde_json::Error) -> Self {
        TravelEtaError::api(format!("Malformed response: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = TravelEtaError::config("missing API key");
        assert!(matches!(config_err, TravelEtaError::Config { .. }));

        let api_err = TravelEtaError::api("connection failed");
        assert!(matches!(api_err, TravelEtaError::Api { .. }));

        let node_err = TravelEtaError::invalid_node("Z");
        assert!(matches!(node_err, TravelEtaError::InvalidNode { .. }));
        assert_eq!(node_err.to_string(), "Invalid node: 'Z'");
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            TravelEtaError::invalid_node("Z").user_message(),
            "Por favor, ingrese nodos válidos"
        );
        assert!(
            TravelEtaError::geolocation("denied")
                .user_message()
                .contains("No se pudo obtener la ubicación")
        );
        assert!(
            TravelEtaError::validation("negative distance")
                .user_message()
                .contains("negative distance")
        );
    }

    #[test]
    fn test_user_error_classification() {
        assert!(TravelEtaError::invalid_node("Z").is_user_error());
        assert!(!TravelEtaError::route_not_found("A-B").is_user_error());
        assert!(!TravelEtaError::GeolocationUnsupported.is_user_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let eta_err: TravelEtaError = io_err.into();
        assert!(matches!(eta_err, TravelEtaError::Io { .. }));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let eta_err: TravelEtaError = json_err.into();
        assert!(matches!(eta_err, TravelEtaError::Api { .. }));
    }
}
