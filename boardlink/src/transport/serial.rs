//! Serial port transport.
//!
//! Lines are framed with [`LinesCodec`]; raw writes bypass the codec and go
//! straight to the underlying stream. The stream type is generic so tests
//! can run the real framing over an in-memory duplex pipe.

use async_trait::async_trait;
use futures::sink::SinkExt;
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    time,
};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_stream::StreamExt;
use tokio_util::codec::{Framed, LinesCodec};

use super::{
    classify::{classify_codec, classify_io, classify_serial, timed_out},
    LineTransport, TransportFactory,
};
use crate::{config::SerialSettings, error::Result, tracing::prelude::*};

/// Longest line a board may send before the stream is considered corrupt.
const MAX_LINE_LENGTH: usize = 256;

/// A [`LineTransport`] over a serial stream.
pub struct SerialLineTransport<S = SerialStream> {
    framed: Framed<S, LinesCodec>,
    timeout: Duration,
    port: String,
}

impl<S> SerialLineTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, port: impl Into<String>, timeout: Duration) -> Self {
        Self {
            framed: Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
            timeout,
            port: port.into(),
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }
}

#[async_trait]
impl<S> LineTransport for SerialLineTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_line(&mut self, line: &str) -> Result<()> {
        trace!(port = %self.port, tx = %line);
        time::timeout(self.timeout, self.framed.send(line))
            .await
            .map_err(|_| timed_out("Serial write", self.timeout))?
            .map_err(|e| classify_codec("Serial write", e))
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        trace!(port = %self.port, tx = ?bytes);
        let stream = self.framed.get_mut();
        let write = async {
            stream.write_all(bytes).await?;
            stream.flush().await
        };
        time::timeout(self.timeout, write)
            .await
            .map_err(|_| timed_out("Serial write", self.timeout))?
            .map_err(|e| classify_io("Serial write", e))
    }

    async fn read_line(&mut self) -> Result<String> {
        self.try_read_line()
            .await?
            .ok_or_else(|| timed_out("Serial read", self.timeout))
    }

    async fn try_read_line(&mut self) -> Result<Option<String>> {
        let line = match time::timeout(self.timeout, self.framed.next()).await {
            Err(_) => return Ok(None),
            Ok(None) => {
                return Err(classify_io(
                    "Serial read",
                    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stream closed"),
                ))
            }
            Ok(Some(result)) => result.map_err(|e| classify_codec("Serial read", e))?,
        };
        trace!(port = %self.port, rx = %line);
        Ok(Some(line))
    }
}

/// Opens native serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortFactory;

impl TransportFactory for SerialPortFactory {
    type Transport = SerialLineTransport<SerialStream>;

    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        settings: &SerialSettings,
    ) -> Result<Self::Transport> {
        debug!(port, baud_rate, "Opening serial port");
        let stream = tokio_serial::new(port, baud_rate)
            .timeout(settings.timeout())
            .open_native_async()
            .map_err(|e| classify_serial(&format!("Opening {port}"), e))?;
        Ok(SerialLineTransport::new(stream, port, settings.timeout()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tokio::io::{duplex, AsyncReadExt};

    const TIMEOUT: Duration = Duration::from_millis(250);

    #[tokio::test]
    async fn lines_are_newline_terminated() {
        let (ours, mut board) = duplex(64);
        let mut transport = SerialLineTransport::new(ours, "test", TIMEOUT);

        transport.write_line("W 2 Z").await.unwrap();
        transport.write_line("A").await.unwrap();

        let mut buf = [0u8; 8];
        board.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"W 2 Z\nA\n");
    }

    #[tokio::test]
    async fn raw_writes_are_unframed() {
        let (ours, mut board) = duplex(64);
        let mut transport = SerialLineTransport::new(ours, "test", TIMEOUT);

        transport.write_raw(&[2, 128]).await.unwrap();

        let mut buf = [0u8; 2];
        board.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [2, 128]);
    }

    #[tokio::test]
    async fn reads_strip_terminators() {
        let (ours, mut board) = duplex(64);
        let mut transport = SerialLineTransport::new(ours, "test", TIMEOUT);

        board.write_all(b"> H\r\n+ OK\n").await.unwrap();
        assert_eq!(transport.read_line().await.unwrap(), "> H");
        assert_eq!(transport.read_line().await.unwrap(), "+ OK");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_board_times_out() {
        let (ours, _board) = duplex(64);
        let mut transport = SerialLineTransport::new(ours, "test", TIMEOUT);

        let err = transport.read_line().await.unwrap_err();
        match err {
            Error::Communication(msg) => assert!(msg.contains("correctly powered"), "{msg}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn try_read_line_reports_timeout_as_none() {
        let (ours, mut board) = duplex(64);
        let mut transport = SerialLineTransport::new(ours, "test", TIMEOUT);

        assert_eq!(transport.try_read_line().await.unwrap(), None);
        board.write_all(b"# Booted\n").await.unwrap();
        assert_eq!(
            transport.try_read_line().await.unwrap().as_deref(),
            Some("# Booted")
        );
    }

    #[tokio::test]
    async fn try_read_line_still_fails_on_closed_stream() {
        let (ours, board) = duplex(64);
        let mut transport = SerialLineTransport::new(ours, "test", TIMEOUT);
        drop(board);

        assert!(matches!(
            transport.try_read_line().await,
            Err(Error::Communication(_))
        ));
    }

    #[tokio::test]
    async fn closed_stream_is_a_communication_error() {
        let (ours, board) = duplex(64);
        let mut transport = SerialLineTransport::new(ours, "test", TIMEOUT);
        drop(board);

        assert!(matches!(
            transport.read_line().await,
            Err(Error::Communication(_))
        ));
    }
}
