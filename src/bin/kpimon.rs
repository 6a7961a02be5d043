//! Bootstrap binary. Wires a running [`kpimon::Control`] against concrete
//! collaborators and blocks until `SIGINT`/`SIGTERM`, then tears down
//! subscriptions before exiting.
//!
//! The codec, transport, and KV store used here are placeholder adapters:
//! the E2AP/E2SM wire encoding and the real transport/KV connections are
//! injected collaborators this crate deliberately does not implement (see
//! the Codec/Transport/KV Store Interface components). Swap these for real
//! ones when wiring this against an actual E2 termination and RAN-side
//! store.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{error, info, warn, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};

use kpimon::codec::{
    E2apCodec, E2smKpmCodec, IndicationHeader, IndicationMessage, IndicationMessageBody, Nrcgi, SliceId,
    SubscriptionDeleteRequestParams, SubscriptionRequestParams, SubscriptionResponseMessage,
};
use kpimon::config::Config;
use kpimon::error::{CodecError, KvStoreError, TransportError};
use kpimon::kvstore::KvStore;
use kpimon::model::Timestamp;
use kpimon::transport::{Frame, Transport};
use kpimon::Control;

fn main() {
    configure_logging();

    let config = Config::from_env().unwrap_or_else(|e| {
        error!("configuration error: {e}");
        std::process::exit(1);
    });

    let transport: Arc<dyn Transport> = Arc::new(LoggingTransport);
    let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::default());
    let e2ap: Arc<dyn E2apCodec> = Arc::new(PlaceholderE2apCodec);
    let e2sm: Arc<dyn E2smKpmCodec> = Arc::new(PlaceholderE2smKpmCodec);

    let control = Control::new(&config, transport, e2ap, e2sm, kv);
    control.start();
    info!("kpimon started, subscribed to {} RAN node(s)", config.ran_list.len());

    let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .expect("failed to install signal handler");

    shutdown_rx.recv().expect("shutdown channel closed unexpectedly");
    info!("shutdown signal received, tearing down subscriptions");
    control.shutdown();
}

fn configure_logging() {
    let config_path = std::env::var("KPIMON_LOG_FILE").unwrap_or_else(|_| "logging-config.yaml".to_owned());
    log4rs::init_file(&config_path, log4rs::config::Deserializers::default()).unwrap_or_else(|e| {
        match e.downcast_ref::<io::Error>() {
            Some(os_err) if os_err.kind() == io::ErrorKind::NotFound => {
                let stdout = ConsoleAppender::builder().build();
                let conf = log4rs::Config::builder()
                    .appender(Appender::builder().build("stdout", Box::new(stdout)))
                    .build(Root::builder().appender("stdout").build(LevelFilter::Info))
                    .unwrap();
                log4rs::init_config(conf).unwrap();
            }
            other => panic!("logging config problem: {other:?}"),
        }
    });
}

/// Logs every frame instead of sending it anywhere.
struct LoggingTransport;

impl Transport for LoggingTransport {
    fn send(&self, frame: Frame) -> Result<(), TransportError> {
        info!(
            "-> {} mtype={} subId={} payload={}B",
            frame.meid.ran_name,
            frame.mtype,
            frame.sub_id,
            frame.payload.len()
        );
        Ok(())
    }

    fn reply(&self, frame: Frame) -> Result<(), TransportError> {
        self.send(frame)
    }
}

/// Process-local KV store. Not durable; a real deployment injects a client
/// for the shared store instead (see the KV Store Interface component).
#[derive(Default)]
struct InMemoryKvStore {
    data: Mutex<HashMap<String, String>>,
}

impl KvStore for InMemoryKvStore {
    fn exists(&self, key: &str) -> Result<bool, KvStoreError> {
        Ok(self.data.lock().unwrap().contains_key(key))
    }

    fn get(&self, key: &str) -> Result<Option<String>, KvStoreError> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), KvStoreError> {
        self.data.lock().unwrap().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn del(&self, key: &str) -> Result<(), KvStoreError> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Builds minimal E2AP payloads and refuses to decode anything: a stand-in
/// until a real ASN.1 PER codec is wired in.
struct PlaceholderE2apCodec;

impl E2apCodec for PlaceholderE2apCodec {
    fn set_subscription_request_payload(&self, params: &SubscriptionRequestParams) -> Result<Vec<u8>, CodecError> {
        Ok(format!("SUB_REQ req={} seq={}", params.request_id, params.request_sequence_number).into_bytes())
    }

    fn set_subscription_delete_request_payload(
        &self,
        params: &SubscriptionDeleteRequestParams,
    ) -> Result<Vec<u8>, CodecError> {
        Ok(format!("SUB_DEL_REQ req={} seq={}", params.request_id, params.request_sequence_number).into_bytes())
    }

    fn get_indication_message(&self, _payload: &[u8]) -> Result<IndicationMessage, CodecError> {
        Err(CodecError::Other("no E2AP codec configured".to_owned()))
    }

    fn get_subscription_response_message(&self, _payload: &[u8]) -> Result<SubscriptionResponseMessage, CodecError> {
        Err(CodecError::Other("no E2AP codec configured".to_owned()))
    }
}

struct PlaceholderE2smKpmCodec;

impl E2smKpmCodec for PlaceholderE2smKpmCodec {
    fn set_event_trigger_definition(&self, _period_ms: i64) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }

    fn set_action_definition(&self, _style_type: i64) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }

    fn get_indication_header(&self, _bytes: &[u8]) -> Result<IndicationHeader, CodecError> {
        Err(CodecError::Other("no E2SM-KPM codec configured".to_owned()))
    }

    fn get_indication_message(&self, _bytes: &[u8]) -> Result<IndicationMessageBody, CodecError> {
        Err(CodecError::Other("no E2SM-KPM codec configured".to_owned()))
    }

    fn parse_nrcgi(&self, _nrcgi: &Nrcgi) -> Result<String, CodecError> {
        Err(CodecError::Other("no E2SM-KPM codec configured".to_owned()))
    }

    fn parse_plmn_identity(&self, _buf: &[u8]) -> Result<String, CodecError> {
        Err(CodecError::Other("no E2SM-KPM codec configured".to_owned()))
    }

    fn parse_slice_id(&self, _slice: &SliceId) -> Result<i32, CodecError> {
        Err(CodecError::Other("no E2SM-KPM codec configured".to_owned()))
    }

    fn parse_timestamp(&self, _buf: &[u8]) -> Result<Timestamp, CodecError> {
        Err(CodecError::Other("no E2SM-KPM codec configured".to_owned()))
    }

    fn parse_integer(&self, _buf: &[u8]) -> Result<u64, CodecError> {
        Err(CodecError::Other("no E2SM-KPM codec configured".to_owned()))
    }
}
