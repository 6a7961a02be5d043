//! The per-RAN subscription lifecycle: request/response/expiry and
//! delete/response/expiry, each tracked in its own mutex-guarded map so a
//! slow delete never blocks a concurrent create. Expiry is polled from a
//! detached thread every 100ms, matching the original's
//! `time.Sleep(100 * time.Millisecond)` cadence (`spec.md` §4.E / §9).

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::codec::{
    ActionDefinitionEntry, E2apCodec, E2smKpmCodec, SubsequentAction, SubscriptionDeleteRequestParams,
    SubscriptionRequestParams,
};
use crate::config::{
    Config, DEFAULT_ACTION_ID, DEFAULT_FUNC_ID, DEFAULT_INITIAL_SUB_ID, DEFAULT_REPORT_PERIOD_MS,
    DEFAULT_REQUEST_ID, DEFAULT_RIC_STYLE_TYPE,
};
use crate::error::TransportError;
use crate::transport::{mtype, Frame, Meid, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateState {
    Pending,
    Acknowledged,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    DeletedPending,
    DeletedAcknowledged,
    DeletedExpired,
}

type CreateMap = Arc<Mutex<HashMap<String, CreateState>>>;
type DeleteMap = Arc<Mutex<HashMap<String, DeleteState>>>;

pub struct SubscriptionController {
    transport: Arc<dyn Transport>,
    e2ap: Arc<dyn E2apCodec>,
    e2sm: Arc<dyn E2smKpmCodec>,
    create_state: CreateMap,
    delete_state: DeleteMap,
    next_sub_id: AtomicI64,
    /// Last subscription id assigned per RAN, so a later `delete_one` call
    /// can be given the matching `(subID, requestSN, funcID)` triple instead
    /// of synthesizing it itself.
    assigned_sub_ids: Arc<Mutex<HashMap<String, i64>>>,
    event_create_expiry: Duration,
    event_delete_expiry: Duration,
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

impl SubscriptionController {
    pub fn new(
        transport: Arc<dyn Transport>,
        e2ap: Arc<dyn E2apCodec>,
        e2sm: Arc<dyn E2smKpmCodec>,
        config: &Config,
    ) -> Self {
        SubscriptionController {
            transport,
            e2ap,
            e2sm,
            create_state: Arc::new(Mutex::new(HashMap::new())),
            delete_state: Arc::new(Mutex::new(HashMap::new())),
            next_sub_id: AtomicI64::new(DEFAULT_INITIAL_SUB_ID),
            assigned_sub_ids: Arc::new(Mutex::new(HashMap::new())),
            event_create_expiry: config.event_create_expiry,
            event_delete_expiry: config.event_delete_expiry,
        }
    }

    /// Sends a `RIC_SUB_REQ` to every RAN in `ran_list`, without mutating
    /// `ran_list` while walking it. RANs whose send failed outright are
    /// returned so the caller can retry them later on its own schedule,
    /// instead of the snapshot being spliced mid-iteration.
    pub fn request_all(&self, ran_list: &[String]) -> Vec<String> {
        let mut retry = Vec::new();
        for ran_name in ran_list {
            if let Err(e) = self.request_one(ran_name) {
                warn!("subscription request to {ran_name} failed: {e}; will retry");
                retry.push(ran_name.clone());
            }
        }
        retry
    }

    /// The subscription id assigned to `ran_name` by its last successful
    /// [`SubscriptionController::request_one`] call, if any. Used by the
    /// caller to build the `(subID, requestSN, funcID)` triple for a later
    /// [`SubscriptionController::delete_one`] call.
    pub fn assigned_sub_id(&self, ran_name: &str) -> Option<i64> {
        self.assigned_sub_ids.lock().unwrap().get(ran_name).copied()
    }

    /// Sends `RIC_SUB_REQ` for `ran_name`, returning the subscription id it
    /// was assigned.
    pub fn request_one(&self, ran_name: &str) -> Result<i64, TransportError> {
        let sub_id = self.next_sub_id.fetch_add(1, Ordering::SeqCst);
        let event_trigger_definition = self
            .e2sm
            .set_event_trigger_definition(DEFAULT_REPORT_PERIOD_MS)
            .map_err(|e| TransportError::Other(e.to_string()))?;
        let action_definition = self
            .e2sm
            .set_action_definition(DEFAULT_RIC_STYLE_TYPE)
            .map_err(|e| TransportError::Other(e.to_string()))?;
        let params = SubscriptionRequestParams {
            request_id: DEFAULT_REQUEST_ID,
            request_sequence_number: sub_id,
            func_id: DEFAULT_FUNC_ID,
            event_trigger_definition,
            actions: vec![ActionDefinitionEntry {
                ric_style_type: DEFAULT_RIC_STYLE_TYPE,
                action_id: DEFAULT_ACTION_ID,
                action_type: 0,
                definition: action_definition,
            }],
            subsequent_actions: vec![SubsequentAction {
                subsequent_action_type: 0,
                time_to_wait: 0,
                ric_action_type: 0,
            }],
        };

        let payload = self
            .e2ap
            .set_subscription_request_payload(&params)
            .map_err(|e| TransportError::Other(e.to_string()))?;

        self.create_state
            .lock()
            .unwrap()
            .insert(ran_name.to_owned(), CreateState::Pending);

        self.transport.send(Frame {
            mtype: mtype::RIC_SUB_REQ,
            sub_id: sub_id as i32,
            meid: Meid::for_ran(ran_name),
            payload,
        })?;

        self.assigned_sub_ids
            .lock()
            .unwrap()
            .insert(ran_name.to_owned(), sub_id);
        self.arm_create_expiry(ran_name.to_owned());
        Ok(sub_id)
    }

    /// Sends `RIC_SUB_DEL_REQ` for `ran_name` using the caller-supplied
    /// `(sub_id, request_sequence_number, func_id)` triple, mirroring
    /// `control.go`'s `sendRicSubDelRequest(subID, requestSN, funcID)`
    /// rather than synthesizing them from `next_sub_id`.
    pub fn delete_one(
        &self,
        ran_name: &str,
        sub_id: i64,
        request_sequence_number: i64,
        func_id: i64,
    ) -> Result<(), TransportError> {
        let params = SubscriptionDeleteRequestParams {
            request_id: DEFAULT_REQUEST_ID,
            request_sequence_number,
            func_id,
        };
        let payload = self
            .e2ap
            .set_subscription_delete_request_payload(&params)
            .map_err(|e| TransportError::Other(e.to_string()))?;

        self.delete_state
            .lock()
            .unwrap()
            .insert(ran_name.to_owned(), DeleteState::DeletedPending);

        self.transport.send(Frame {
            mtype: mtype::RIC_SUB_DEL_REQ,
            sub_id: sub_id as i32,
            meid: Meid::for_ran(ran_name),
            payload,
        })?;

        self.arm_delete_expiry(ran_name.to_owned());
        Ok(())
    }

    /// `RIC_SUB_RESP` handler. A response for a RAN that is no longer
    /// `Pending` (already acknowledged or expired) is a late response and is
    /// dropped, per `spec.md` §4.E.
    pub fn on_response(&self, ran_name: &str) {
        let mut state = self.create_state.lock().unwrap();
        match state.get(ran_name) {
            Some(CreateState::Pending) => {
                state.remove(ran_name);
                info!("subscription acknowledged for {ran_name}");
            }
            other => {
                debug!("dropping late/unknown subscription response for {ran_name}: {other:?}");
            }
        }
    }

    pub fn on_failure(&self, ran_name: &str) {
        let mut state = self.create_state.lock().unwrap();
        match state.get(ran_name) {
            Some(CreateState::Pending) => {
                state.remove(ran_name);
                warn!("subscription explicitly refused for {ran_name}");
            }
            other => {
                debug!("dropping late/unknown subscription failure for {ran_name}: {other:?}");
            }
        }
    }

    pub fn on_delete_response(&self, ran_name: &str) {
        let mut state = self.delete_state.lock().unwrap();
        match state.get(ran_name) {
            Some(DeleteState::DeletedPending) => {
                state.remove(ran_name);
                info!("subscription delete acknowledged for {ran_name}");
            }
            other => {
                debug!("dropping late/unknown delete response for {ran_name}: {other:?}");
            }
        }
    }

    pub fn on_delete_failure(&self, ran_name: &str) {
        let mut state = self.delete_state.lock().unwrap();
        match state.get(ran_name) {
            Some(DeleteState::DeletedPending) => {
                state.remove(ran_name);
                warn!("subscription delete explicitly refused for {ran_name}");
            }
            other => {
                debug!("dropping late/unknown delete failure for {ran_name}: {other:?}");
            }
        }
    }

    pub fn create_state_of(&self, ran_name: &str) -> Option<CreateState> {
        self.create_state.lock().unwrap().get(ran_name).copied()
    }

    pub fn delete_state_of(&self, ran_name: &str) -> Option<DeleteState> {
        self.delete_state.lock().unwrap().get(ran_name).copied()
    }

    fn arm_create_expiry(&self, ran_name: String) {
        let map = Arc::clone(&self.create_state);
        let expiry = self.event_create_expiry;
        thread::spawn(move || poll_create_expiry(map, ran_name, expiry));
    }

    fn arm_delete_expiry(&self, ran_name: String) {
        let map = Arc::clone(&self.delete_state);
        let expiry = self.event_delete_expiry;
        thread::spawn(move || poll_delete_expiry(map, ran_name, expiry));
    }
}

fn poll_create_expiry(map: CreateMap, ran_name: String, expiry: Duration) {
    let mut waited = Duration::ZERO;
    loop {
        thread::sleep(POLL_INTERVAL);
        waited += POLL_INTERVAL;
        let mut state = map.lock().unwrap();
        match state.get(&ran_name) {
            Some(CreateState::Pending) => {
                if waited >= expiry {
                    state.remove(&ran_name);
                    warn!("subscription request to {ran_name} timed out after {expiry:?}");
                    return;
                }
            }
            _ => return,
        }
    }
}

fn poll_delete_expiry(map: DeleteMap, ran_name: String, expiry: Duration) {
    let mut waited = Duration::ZERO;
    loop {
        thread::sleep(POLL_INTERVAL);
        waited += POLL_INTERVAL;
        let mut state = map.lock().unwrap();
        match state.get(&ran_name) {
            Some(DeleteState::DeletedPending) => {
                if waited >= expiry {
                    state.remove(&ran_name);
                    warn!("subscription delete for {ran_name} timed out after {expiry:?}");
                    return;
                }
            }
            _ => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{IndicationHeader, IndicationMessage, IndicationMessageBody, Nrcgi, SliceId, SubscriptionResponseMessage};
    use crate::error::CodecError;
    use crate::model::Timestamp;
    use std::sync::Mutex as StdMutex;

    struct NullE2ap;
    impl E2apCodec for NullE2ap {
        fn set_subscription_request_payload(
            &self,
            _params: &SubscriptionRequestParams,
        ) -> Result<Vec<u8>, CodecError> {
            Ok(vec![1])
        }
        fn set_subscription_delete_request_payload(
            &self,
            _params: &SubscriptionDeleteRequestParams,
        ) -> Result<Vec<u8>, CodecError> {
            Ok(vec![2])
        }
        fn get_indication_message(&self, _payload: &[u8]) -> Result<IndicationMessage, CodecError> {
            unimplemented!()
        }
        fn get_subscription_response_message(
            &self,
            _payload: &[u8],
        ) -> Result<SubscriptionResponseMessage, CodecError> {
            unimplemented!()
        }
    }

    struct NullE2sm;
    impl E2smKpmCodec for NullE2sm {
        fn set_event_trigger_definition(&self, _period_ms: i64) -> Result<Vec<u8>, CodecError> {
            Ok(Vec::new())
        }
        fn set_action_definition(&self, _style_type: i64) -> Result<Vec<u8>, CodecError> {
            Ok(Vec::new())
        }
        fn get_indication_header(&self, _bytes: &[u8]) -> Result<IndicationHeader, CodecError> {
            unimplemented!()
        }
        fn get_indication_message(&self, _bytes: &[u8]) -> Result<IndicationMessageBody, CodecError> {
            unimplemented!()
        }
        fn parse_nrcgi(&self, _nrcgi: &Nrcgi) -> Result<String, CodecError> {
            unimplemented!()
        }
        fn parse_plmn_identity(&self, _buf: &[u8]) -> Result<String, CodecError> {
            unimplemented!()
        }
        fn parse_slice_id(&self, _slice: &SliceId) -> Result<i32, CodecError> {
            unimplemented!()
        }
        fn parse_timestamp(&self, _buf: &[u8]) -> Result<Timestamp, CodecError> {
            unimplemented!()
        }
        fn parse_integer(&self, _buf: &[u8]) -> Result<u64, CodecError> {
            unimplemented!()
        }
    }

    struct RecordingTransport {
        sent: StdMutex<Vec<Frame>>,
    }
    impl Transport for RecordingTransport {
        fn send(&self, frame: Frame) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }
        fn reply(&self, _frame: Frame) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn test_config() -> Config {
        Config {
            ran_list: vec!["ran1".into()],
            kvstore_addr: "x".into(),
            log_config_file: None,
            event_create_expiry: Duration::from_millis(250),
            event_delete_expiry: Duration::from_millis(250),
            subscription_retry_interval: Duration::from_secs(1),
            max_subscription_attempts: 3,
        }
    }

    #[test]
    fn acknowledged_before_timeout_never_expires() {
        let transport = Arc::new(RecordingTransport { sent: StdMutex::new(vec![]) });
        let ctl = SubscriptionController::new(transport, Arc::new(NullE2ap), Arc::new(NullE2sm), &test_config());
        ctl.request_one("ran1").unwrap();
        assert_eq!(ctl.create_state_of("ran1"), Some(CreateState::Pending));
        ctl.on_response("ran1");
        // the record is removed on acknowledgment, not left around for the
        // timer to act on; final map is empty, per spec.md §8.
        assert_eq!(ctl.create_state_of("ran1"), None);
        thread::sleep(Duration::from_millis(400));
        assert_eq!(ctl.create_state_of("ran1"), None);
    }

    #[test]
    fn unacknowledged_request_expires() {
        let transport = Arc::new(RecordingTransport { sent: StdMutex::new(vec![]) });
        let ctl = SubscriptionController::new(transport, Arc::new(NullE2ap), Arc::new(NullE2sm), &test_config());
        ctl.request_one("ran1").unwrap();
        thread::sleep(Duration::from_millis(500));
        assert_eq!(ctl.create_state_of("ran1"), None);
    }

    #[test]
    fn late_response_after_expiry_is_dropped() {
        let transport = Arc::new(RecordingTransport { sent: StdMutex::new(vec![]) });
        let ctl = SubscriptionController::new(transport, Arc::new(NullE2ap), Arc::new(NullE2sm), &test_config());
        ctl.request_one("ran1").unwrap();
        thread::sleep(Duration::from_millis(500));
        assert_eq!(ctl.create_state_of("ran1"), None);
        ctl.on_response("ran1");
        assert_eq!(ctl.create_state_of("ran1"), None);
    }
}
