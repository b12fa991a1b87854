//! Shared fakes for push relay integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use push_relay::transport::HubRegistration;
use push_relay::{HubTransport, PlatformTransport, TransportError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Issues `T1`, optionally waiting for a permit first.
pub struct FakePlatform {
    pub calls: AtomicU32,
    gate: Option<Arc<Semaphore>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            gate: None,
        }
    }

    /// Hold every token request until the returned semaphore gets a permit.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let platform = Self {
            calls: AtomicU32::new(0),
            gate: Some(gate.clone()),
        };
        (platform, gate)
    }
}

#[async_trait]
impl PlatformTransport for FakePlatform {
    async fn issue_token(&self, _sender_identifier: &str) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| TransportError::Other(e.to_string()))?;
            permit.forget();
        }
        Ok("T1".to_string())
    }
}

/// Registers every token as `R1`; revocation can be made to fail.
pub struct FakeHub {
    pub registrations: AtomicU32,
    pub revocations: AtomicU32,
    pub fail_revoke: bool,
}

impl FakeHub {
    pub fn new() -> Self {
        Self {
            registrations: AtomicU32::new(0),
            revocations: AtomicU32::new(0),
            fail_revoke: false,
        }
    }

    pub fn failing_revoke() -> Self {
        Self {
            fail_revoke: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl HubTransport for FakeHub {
    async fn register_token(
        &self,
        hub_identifier: &str,
        _connection_credential: &str,
        _token: &str,
    ) -> Result<HubRegistration, TransportError> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(HubRegistration {
            registration_id: "R1".into(),
            hub_path: hub_identifier.to_string(),
        })
    }

    async fn revoke(
        &self,
        _hub_identifier: &str,
        _connection_credential: &str,
    ) -> Result<(), TransportError> {
        self.revocations.fetch_add(1, Ordering::SeqCst);
        if self.fail_revoke {
            return Err(TransportError::Other("revocation refused".into()));
        }
        Ok(())
    }
}
