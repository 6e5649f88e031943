pub mod api;

use crate::agent::Companion;
use crate::cli::Args;
use api::AppState;
use axum_server::tls_rustls::RustlsConfig;
use log::{ error, info, warn };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct Server {
    addr: String,
    companion: Arc<Companion>,
    api_key: Option<String>,
    args: Args,
}

impl Server {
    pub fn new(addr: String, companion: Arc<Companion>, api_key: Option<String>, args: Args) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        if api_key.is_some() {
            info!("Server configured with API Key authentication.");
        } else {
            warn!("Server configured WITHOUT API Key authentication. Endpoints are open.");
        }

        Self { addr, companion, api_key, args }
    }

    async fn tls_config(&self) -> Result<Option<RustlsConfig>, Box<dyn Error + Send + Sync>> {
        if !self.args.enable_tls {
            info!("TLS not enabled. Running plain HTTP server.");
            return Ok(None);
        }
        match (&self.args.tls_cert_path, &self.args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => {
                info!(
                    "TLS enabled. Loading certificate from '{}' and key from '{}'",
                    cert_path,
                    key_path
                );
                let config = RustlsConfig::from_pem_file(cert_path, key_path).await.map_err(|e|
                    format!("Failed to load TLS certificate/key: {}", e)
                )?;
                Ok(Some(config))
            }
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                Err("Missing TLS certificate or key path".into())
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                Err("TLS enabled without cert/key".into())
            }
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr: SocketAddr = self.addr
            .parse()
            .map_err(|e| format!("Invalid SERVER_ADDR '{}': {}", self.addr, e))?;
        let state = AppState::new(
            Arc::clone(&self.companion),
            self.api_key.clone(),
            self.args.rate_limit_per_second
        );
        let app = api::router(state);

        match self.tls_config().await? {
            Some(tls_config) => {
                info!("HTTPS server listening on: https://{}", addr);
                axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e|
                    format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e)
                )?;
                info!("HTTP server listening on: http://{}", addr);
                axum::serve(listener, app.into_make_service()).await?;
            }
        }
        Ok(())
    }
}
