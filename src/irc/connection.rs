//! Transport setup and deadline-bounded line I/O.
//!
//! [`dial`] opens a plaintext or TLS stream to the server. [`Connection`]
//! wraps that stream for line-oriented access where every read and write is
//! bounded by a deadline.

use super::codec::LineCodec;
use super::error::ClientError;
use futures::StreamExt;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_rustls::TlsConnector;
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

/// How long dialing (TCP connect plus TLS handshake) may take.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle time and retransmit interval for TCP keep-alive.
pub const KEEPALIVE: Duration = Duration::from_secs(30);

/// Default deadline for each read and write.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Any bidirectional byte stream the client can talk over.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

/// An established plaintext or TLS stream.
pub type Transport = Box<dyn AsyncStream>;

/// Open a connection to `host:port`, optionally wrapped in TLS.
///
/// Certificates are not validated when `tls` is set: IRC servers commonly
/// present self-signed or mismatched certificates.
pub async fn dial(host: &str, port: u16, tls: bool) -> Result<Transport, ClientError> {
    let addr = format!("{}:{}", host, port);
    match timeout(CONNECT_TIMEOUT, dial_inner(host, &addr, tls)).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Connect {
            addr,
            source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
        }),
    }
}

async fn dial_inner(host: &str, addr: &str, tls: bool) -> Result<Transport, ClientError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;

    if let Err(e) = enable_keepalive(&stream) {
        warn!(addr = %addr, error = %e, "failed to enable TCP keepalive");
    }

    if !tls {
        debug!(addr = %addr, "connected");
        return Ok(Box::new(stream));
    }

    let connector = TlsConnector::from(Arc::new(insecure_client_config()?));
    let server_name =
        ServerName::try_from(host.to_string()).map_err(|e| ClientError::Tls(e.to_string()))?;
    let stream = connector
        .connect(server_name, stream)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;

    debug!(addr = %addr, "connected with TLS");
    Ok(Box::new(stream))
}

fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE);
    #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
    let keepalive = keepalive.with_interval(KEEPALIVE);

    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}

fn insecure_client_config() -> Result<ClientConfig, ClientError> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
        .with_no_client_auth();
    Ok(config)
}

/// Accepts any server certificate. Handshake signatures are still checked so
/// the session keys belong to whoever presented the certificate.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Line-oriented access to a [`Transport`].
pub struct Connection {
    lines: FramedRead<ReadHalf<Transport>, LineCodec>,
    writer: BufWriter<WriteHalf<Transport>>,
}

impl Connection {
    pub fn new(transport: Transport) -> Self {
        let (reader, writer) = tokio::io::split(transport);
        Self {
            lines: FramedRead::new(reader, LineCodec::new()),
            writer: BufWriter::new(writer),
        }
    }

    /// Read one line, failing with `TimedOut` if none arrives by `deadline`.
    ///
    /// Cancel-safe: dropping the future before it completes loses no data.
    pub async fn read_line(&mut self, deadline: Instant) -> io::Result<String> {
        match timeout_at(deadline, self.lines.next()).await {
            Ok(Some(line)) => line,
            Ok(None) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )),
            Err(_) => Err(deadline_exceeded()),
        }
    }

    /// Write and flush one complete line within `limit`.
    pub async fn write_line(&mut self, line: &str, limit: Duration) -> io::Result<()> {
        let write = async {
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.flush().await
        };
        match timeout(limit, write).await {
            Ok(result) => result,
            Err(_) => Err(deadline_exceeded()),
        }
    }

    /// Shut the stream down, sending a TLS close_notify where applicable.
    pub async fn close(self, limit: Duration) -> io::Result<()> {
        let reader = self.lines.into_inner();
        let writer = self.writer.into_inner();
        let mut transport = reader.unsplit(writer);
        match timeout(limit, transport.shutdown()).await {
            Ok(result) => result,
            Err(_) => Err(deadline_exceeded()),
        }
    }
}

fn deadline_exceeded() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "i/o deadline exceeded")
}
