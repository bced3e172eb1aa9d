//! Opening the byte stream a session runs over

use crate::config::ServerAddress;
use crate::errors::ConnectionError;

use async_trait::async_trait;
use rustls::{OwnedTrustAnchor, RootCertStore, ServerName};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

/// Any bidirectional byte stream a session can run over
pub trait LobbyStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> LobbyStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub type BoxedStream = Box<dyn LobbyStream>;

/// Opens a fresh transport each time a session starts, including on reconnect
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<BoxedStream, ConnectionError>;
}

/// Plain TCP, or TLS verified against the bundled web PKI roots
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: ServerAddress,
}

impl TcpConnector {
    pub fn new(address: ServerAddress) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &ServerAddress {
        &self.address
    }

    fn tls_config() -> rustls::ClientConfig {
        let mut root_store = RootCertStore::empty();
        root_store.add_server_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.0.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));

        rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_store)
            .with_no_client_auth()
    }
}

#[async_trait]
impl Connector for TcpConnector {
    #[tracing::instrument(skip(self), fields(host = %self.address.host, port = self.address.port))]
    async fn connect(&self) -> Result<BoxedStream, ConnectionError> {
        let tcp = TcpStream::connect((self.address.host.as_str(), self.address.port)).await?;
        tcp.set_nodelay(true)?;

        if !self.address.tls {
            tracing::debug!("Connected");
            return Ok(Box::new(tcp));
        }

        let server_name = ServerName::try_from(self.address.host.as_str())
            .map_err(|_| ConnectionError::InvalidServerName(self.address.host.clone()))?;
        let connector = TlsConnector::from(Arc::new(Self::tls_config()));
        let stream = connector.connect(server_name, tcp).await?;

        tracing::debug!("Connected with TLS");
        Ok(Box::new(stream))
    }
}
