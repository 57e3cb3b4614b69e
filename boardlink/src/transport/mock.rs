//! Scripted in-memory transport for tests.

use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use super::{LineTransport, TransportFactory};
use crate::{
    config::SerialSettings,
    error::{Error, Result},
};

type Responder = Box<dyn FnMut(&[u8]) -> Vec<String> + Send>;

struct Script {
    incoming: VecDeque<String>,
    sent: Vec<u8>,
    responder: Option<Responder>,
}

/// A transport that replays queued lines and records everything written.
///
/// Clones share state, so a test can keep one clone to inspect traffic
/// while a backend owns another.
#[derive(Clone)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                incoming: VecDeque::new(),
                sent: Vec::new(),
                responder: None,
            })),
        }
    }

    /// Queue replies produced by `responder` after every write.
    pub fn with_responder(
        self,
        responder: impl FnMut(&[u8]) -> Vec<String> + Send + 'static,
    ) -> Self {
        self.script.lock().unwrap().responder = Some(Box::new(responder));
        self
    }

    /// Queue a line for the backend to read.
    pub fn push_line(&self, line: &str) {
        self.script.lock().unwrap().incoming.push_back(line.to_string());
    }

    /// Take everything written since the last call.
    pub fn take_sent(&self) -> Vec<u8> {
        std::mem::take(&mut self.script.lock().unwrap().sent)
    }

    /// Assert exactly `expected` was written since the last check.
    #[track_caller]
    pub fn check_sent(&self, expected: &[u8]) {
        let sent = self.take_sent();
        assert_eq!(
            String::from_utf8_lossy(&sent),
            String::from_utf8_lossy(expected),
            "unexpected bytes written to transport"
        );
    }

    #[track_caller]
    pub fn check_all_received_data_consumed(&self) {
        let script = self.script.lock().unwrap();
        assert!(
            script.incoming.is_empty(),
            "unread lines left in transport: {:?}",
            script.incoming
        );
    }

    fn record(&self, bytes: &[u8]) {
        let mut guard = self.script.lock().unwrap();
        let script = &mut *guard;
        script.sent.extend_from_slice(bytes);
        if let Some(responder) = script.responder.as_mut() {
            let replies = responder(bytes);
            script.incoming.extend(replies);
        }
    }
}

#[async_trait]
impl LineTransport for ScriptedTransport {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        self.record(&bytes);
        Ok(())
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.record(bytes);
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String> {
        self.try_read_line().await?.ok_or_else(|| {
            Error::Communication(
                "Serial read: no response from board; is the board correctly powered?".into(),
            )
        })
    }

    /// An empty queue stands in for a read timeout.
    async fn try_read_line(&mut self) -> Result<Option<String>> {
        Ok(self.script.lock().unwrap().incoming.pop_front())
    }
}

/// Hands out clones of one scripted transport.
pub(crate) struct ScriptedFactory {
    pub transport: ScriptedTransport,
}

impl TransportFactory for ScriptedFactory {
    type Transport = ScriptedTransport;

    fn open(&self, _port: &str, _baud_rate: u32, _settings: &SerialSettings) -> Result<Self::Transport> {
        Ok(self.transport.clone())
    }
}
