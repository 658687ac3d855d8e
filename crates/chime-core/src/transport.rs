//! Outbound message transport.
//!
//! Delivery to the chat network lives outside Chime; the dispatch runtime and
//! the job timer only need something that can put text on a [`Target`].

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::Result;
use crate::event::Target;

#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, target: Target, text: &str) -> Result<()>;
}

/// Writes every outgoing message to the log. Used when no network adapter is
/// attached.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, target: Target, text: &str) -> Result<()> {
        tracing::info!("📤 [{target}] {text}");
        Ok(())
    }
}

/// Keeps every outgoing message in memory.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Target, String)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Target, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, target: Target, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((target, text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_transport() {
        let transport = RecordingTransport::new();
        transport.send(Target::Group(1), "a").await.unwrap();
        transport.send(Target::Private(2), "b").await.unwrap();
        assert_eq!(
            transport.sent(),
            vec![(Target::Group(1), "a".to_string()), (Target::Private(2), "b".to_string())]
        );
        transport.clear();
        assert!(transport.texts().is_empty());
    }
}
