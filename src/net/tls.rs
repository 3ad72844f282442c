//! TLS configuration and certificate loading.

use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use serde::{Deserialize, Serialize};

/// PEM certificate chain and private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Load a rustls server configuration from the configured PEM files.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, std::io::Error> {
    for path in [&config.cert_path, &config.key_path] {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("TLS file not found: {}", path.display()),
            ));
        }
    }

    RustlsConfig::from_pem_file(&config.cert_path, &config.key_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = TlsConfig {
            cert_path: dir.path().join("cert.pem"),
            key_path: dir.path().join("key.pem"),
        };
        let err = load_tls_config(&config).await.err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().contains("cert.pem"));
    }
}
