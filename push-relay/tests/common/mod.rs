#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use apns_gateway::{
    DeliveryOutcome, Environment, GatewayRequest, PushTransport, TransportError,
    TransportFactory, TransportHandle,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use push_relay::config::RelayConfig;
use push_relay::database::{DeviceKey, DeviceRecord, DeviceRepository, DeviceUpdate};
use push_relay::relay::{Dispatcher, Notification, RelayContext};
use push_relay::{Error, Result};

pub const APP: &str = "cam.reaction.ReactionCam";

pub type Reply = std::result::Result<DeliveryOutcome, TransportError>;

pub fn status(status: u16) -> Reply {
    Ok(DeliveryOutcome::new(status, bytes::Bytes::new()))
}

/// Replays canned replies in order, then answers 200.
///
/// When `gate` is set every send waits for it before replying.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<(Instant, GatewayRequest)>>,
    gate: Option<Arc<Notify>>,
    pub entered: Notify,
}

impl FakeTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent.lock().iter().map(|(at, _)| *at).collect()
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.sent.lock().iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait]
impl PushTransport for FakeTransport {
    async fn send(&self, request: &GatewayRequest) -> Reply {
        self.sent.lock().push((Instant::now(), request.clone()));
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(DeliveryOutcome::ok()))
    }
}

/// Hands out the next queued transport on each construct, repeating the last.
pub struct FakeFactory {
    transports: Mutex<VecDeque<Arc<FakeTransport>>>,
    last: Mutex<Option<Arc<FakeTransport>>>,
    pub constructed: AtomicUsize,
}

impl FakeFactory {
    pub fn new(transports: impl IntoIterator<Item = Arc<FakeTransport>>) -> Arc<Self> {
        Arc::new(Self {
            transports: Mutex::new(transports.into_iter().collect()),
            last: Mutex::new(None),
            constructed: AtomicUsize::new(0),
        })
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }
}

impl TransportFactory for FakeFactory {
    fn construct(&self, _app: &str) -> apns_gateway::Result<TransportHandle> {
        self.constructed.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock();
        let transport = match self.transports.lock().pop_front() {
            Some(next) => next,
            None => last.clone().unwrap_or_else(|| FakeTransport::new([])),
        };
        *last = Some(transport.clone());
        Ok(transport)
    }
}

/// In-memory device store that records which operations were issued.
#[derive(Default)]
pub struct RecordingDevices {
    records: Mutex<HashMap<DeviceKey, DeviceRecord>>,
    pub successes: AtomicUsize,
    pub failures: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl RecordingDevices {
    pub fn with_device(key: &DeviceKey) -> Arc<Self> {
        let devices = Self::default();
        devices.records.lock().insert(
            key.clone(),
            DeviceRecord::new(key.clone(), APP, Environment::Production.as_str()),
        );
        Arc::new(devices)
    }

    pub fn record(&self, key: &DeviceKey) -> Option<DeviceRecord> {
        self.records.lock().get(key).cloned()
    }

    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn touched(&self) -> usize {
        self.successes() + self.failures() + self.deletes()
    }
}

#[async_trait]
impl DeviceRepository for RecordingDevices {
    async fn get(&self, key: &DeviceKey) -> Result<Option<DeviceRecord>> {
        Ok(self.record(key))
    }

    async fn put(&self, record: &DeviceRecord) -> Result<()> {
        self.records.lock().insert(record.key(), record.clone());
        Ok(())
    }

    async fn delete(&self, key: &DeviceKey) -> Result<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().remove(key).is_some())
    }

    async fn update_in_transaction(
        &self,
        key: &DeviceKey,
        update: DeviceUpdate<'_>,
    ) -> Result<DeviceRecord> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(key)
            .ok_or_else(|| Error::not_found("device", key.to_string()))?;

        let before = record.total_successes;
        update(record);
        if record.total_successes > before {
            self.successes.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        Ok(record.clone())
    }
}

pub fn device_key() -> DeviceKey {
    DeviceKey::new(1001, "f00dfeed")
}

pub fn notification(app: &str) -> Notification {
    Notification::new(
        1001,
        app,
        "f00dfeed",
        Environment::Production,
        &br#"{"aps":{"alert":"New reaction"}}"#[..],
    )
}

/// Context with `APP` registered against `factory`.
pub fn relay(
    factory: Arc<FakeFactory>,
    devices: Arc<RecordingDevices>,
) -> (Arc<RelayContext>, Dispatcher) {
    let config = RelayConfig::default();
    let ctx = Arc::new(RelayContext::new(factory, devices, &config));
    ctx.create_apps(&[APP.to_string()]).expect("register app");
    let dispatcher = Dispatcher::new(ctx.clone());
    (ctx, dispatcher)
}
