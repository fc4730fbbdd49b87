//! HTTP-backed writer, posting each record's rendered message to a remote
//! collector endpoint in `ureq`'s blocking request-per-call style.

use std::time::Duration;

use crate::error::WriteError;
use crate::record::LogRecord;
use crate::writer::Writer;

pub struct NetworkWriter {
    name: String,
    endpoint: String,
    agent: ureq::Agent,
    healthy: bool,
}

impl NetworkWriter {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(5)))
            .build()
            .into();
        NetworkWriter {
            name: name.into(),
            endpoint: endpoint.into(),
            agent,
            healthy: true,
        }
    }
}

impl Writer for NetworkWriter {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        let body = record.message.clone();
        match self
            .agent
            .post(&self.endpoint)
            .header("Content-Type", "text/plain; charset=utf-8")
            .send(&body)
        {
            Ok(_) => {
                self.healthy = true;
                Ok(())
            }
            Err(ureq::Error::StatusCode(code)) if code >= 500 => {
                self.healthy = false;
                Err(WriteError::Transient(format!("server returned {code}")))
            }
            Err(e) => {
                self.healthy = false;
                Err(WriteError::Transient(e.to_string()))
            }
        }
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        // Each write is a synchronous request; nothing is buffered locally.
        Ok(())
    }

    fn healthy(&self) -> bool {
        self.healthy
    }

    fn name(&self) -> &str {
        &self.name
    }
}
