//! Shared reqwest plumbing: client construction with timeouts and optional
//! mutual TLS, plus the response-body capture used by every non-2xx error.
use reqwest::{Certificate, Client, Identity, Response, redirect};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{GlueError, Result};

const REDIRECT_LIMIT: usize = 10;

/// Certificate material for a mutually authenticated TLS session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
    pub ca_bundle: PathBuf,
}

impl TlsFiles {
    /// Lays out the paths the way a Puppet agent stores its SSL directory.
    pub fn from_ssl_dir(ssl_dir: &Path, certname: &str) -> Self {
        Self {
            client_cert: ssl_dir.join("certs").join(format!("{certname}.pem")),
            client_key: ssl_dir.join("private_keys").join(format!("{certname}.pem")),
            ca_bundle: ssl_dir.join("certs").join("ca.pem"),
        }
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        error!(path = ?path, error = %e, "Failed to read PEM file.");
        GlueError::CertificateRead {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Builds a client with a bounded per-request timeout.
///
/// With `tls` set, only the given CA bundle is trusted and the client identity
/// (certificate followed by its key) is presented during the handshake.
pub fn build_client(timeout: Duration, tls: Option<&TlsFiles>) -> Result<Client> {
    let mut builder = Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .redirect(redirect::Policy::limited(REDIRECT_LIMIT));

    if let Some(files) = tls {
        let ca = Certificate::from_pem(&read_pem(&files.ca_bundle)?)?;

        let mut identity_pem = read_pem(&files.client_cert)?;
        if !identity_pem.ends_with(b"\n") {
            identity_pem.push(b'\n');
        }
        identity_pem.extend_from_slice(&read_pem(&files.client_key)?);
        let identity = Identity::from_pem(&identity_pem)?;

        debug!(ca = ?files.ca_bundle, cert = ?files.client_cert, "Configured mutual TLS.");
        builder = builder
            .tls_built_in_root_certs(false)
            .add_root_certificate(ca)
            .identity(identity);
    }

    Ok(builder.build()?)
}

/// Consumes a failed response, keeping its status and body for diagnostics.
pub async fn failure_parts(response: Response) -> (reqwest::StatusCode, String) {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    (status, body)
}
