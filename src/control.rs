//! Bootstrap wiring: the single long-lived value that owns the router
//! worker, the subscription controller, and the injected collaborators, and
//! dispatches inbound frames by message type. See `spec.md` §4.G / §9.

use std::sync::Arc;
use std::thread;

use log::{error, info, warn};

use crate::codec::{E2apCodec, E2smKpmCodec};
use crate::config::{Config, DEFAULT_FUNC_ID};
use crate::kvstore::KvStore;
use crate::router::{self, RouterHandle, RouterSender};
use crate::subscription::SubscriptionController;
use crate::transport::{mtype, Frame, Transport};

/// Owns the whole running system: hands inbound frames from `router_tx` to
/// the router worker, which dispatches them back into `Control::dispatch`.
pub struct Control {
    subscriptions: Arc<SubscriptionController>,
    ran_list: Vec<String>,
    subscription_retry_interval: std::time::Duration,
    max_subscription_attempts: u32,
    router_tx: RouterSender,
    router_handle: Option<RouterHandle>,
}

impl Control {
    /// Wires the collaborators together and starts the router worker. Does
    /// not send any subscription requests yet; call [`Control::start`] for
    /// that.
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        e2ap: Arc<dyn E2apCodec>,
        e2sm: Arc<dyn E2smKpmCodec>,
        kv: Arc<dyn KvStore>,
    ) -> Self {
        let subscriptions = Arc::new(SubscriptionController::new(
            Arc::clone(&transport),
            Arc::clone(&e2ap),
            Arc::clone(&e2sm),
            config,
        ));

        let dispatch_subscriptions = Arc::clone(&subscriptions);
        let dispatch_e2ap = Arc::clone(&e2ap);
        let dispatch_e2sm = Arc::clone(&e2sm);
        let dispatch_kv = Arc::clone(&kv);
        let (router_tx, router_handle) = router::spawn(move |frame: Frame| {
            dispatch(
                frame,
                &dispatch_subscriptions,
                dispatch_e2ap.as_ref(),
                dispatch_e2sm.as_ref(),
                dispatch_kv.as_ref(),
            )
        })
        .expect("failed to start router worker");

        Control {
            subscriptions,
            ran_list: config.ran_list.clone(),
            subscription_retry_interval: config.subscription_retry_interval,
            max_subscription_attempts: config.max_subscription_attempts,
            router_tx,
            router_handle: Some(router_handle),
        }
    }

    /// Sends `RIC_SUB_REQ` to every configured RAN. RANs that fail the
    /// initial send are retried in the background without the master RAN
    /// list ever being mutated while it is being walked (`spec.md` §4.E
    /// REDESIGN FLAG).
    pub fn start(&self) {
        info!("subscribing to {} RAN node(s)", self.ran_list.len());
        let failed = self.subscriptions.request_all(&self.ran_list);
        if !failed.is_empty() {
            self.spawn_retry(failed);
        }
    }

    fn spawn_retry(&self, mut pending: Vec<String>) {
        let subscriptions = Arc::clone(&self.subscriptions);
        let retry_interval = self.subscription_retry_interval;
        let max_attempts = self.max_subscription_attempts;
        thread::spawn(move || {
            let mut attempt = 1u32;
            while !pending.is_empty() && attempt < max_attempts {
                thread::sleep(retry_interval);
                let mut still_pending = Vec::new();
                for ran_name in &pending {
                    if let Err(e) = subscriptions.request_one(ran_name) {
                        warn!("retry {attempt} of subscription request to {ran_name} failed: {e}");
                        still_pending.push(ran_name.clone());
                    }
                }
                pending = still_pending;
                attempt += 1;
            }
            for ran_name in pending {
                error!("giving up on subscription request to {ran_name} after {attempt} attempts");
            }
        });
    }

    /// Queues an externally-received frame for the router worker to
    /// dispatch. The host's transport listener calls this.
    pub fn consume(&self, frame: Frame) -> Result<(), std::io::Error> {
        self.router_tx.send(frame)
    }

    /// Sends `RIC_SUB_DEL_REQ` for a single RAN, e.g. on graceful shutdown
    /// or operator-driven teardown. Uses the subscription id assigned by
    /// this RAN's last `request_one` call as `requestSN` too, matching
    /// `control.go`'s `sendRicSubDelRequest(subID, requestSN, funcID)`.
    pub fn delete(&self, ran_name: &str) {
        let Some(sub_id) = self.subscriptions.assigned_sub_id(ran_name) else {
            warn!("no known subscription id for {ran_name}; skipping delete request");
            return;
        };
        if let Err(e) = self.subscriptions.delete_one(ran_name, sub_id, sub_id, DEFAULT_FUNC_ID) {
            warn!("subscription delete request to {ran_name} failed: {e}");
        }
    }

    pub fn shutdown(mut self) {
        for ran_name in &self.ran_list {
            self.delete(ran_name);
        }
        if let Some(handle) = self.router_handle.take() {
            handle.shutdown();
        }
    }
}

fn dispatch(
    frame: Frame,
    subscriptions: &SubscriptionController,
    e2ap: &dyn E2apCodec,
    e2sm: &dyn E2smKpmCodec,
    kv: &dyn KvStore,
) {
    let ran_name = frame.meid.ran_name.clone();
    match frame.mtype {
        mtype::RIC_SUB_RESP => subscriptions.on_response(&ran_name),
        mtype::RIC_SUB_FAILURE => subscriptions.on_failure(&ran_name),
        mtype::RIC_SUB_DEL_RESP => subscriptions.on_delete_response(&ran_name),
        mtype::RIC_SUB_DEL_FAILURE => subscriptions.on_delete_failure(&ran_name),
        mtype::RIC_INDICATION => {
            if let Err(e) = crate::indication::handle_indication(&frame, e2ap, e2sm, kv) {
                error!("failed to decode RIC Indication message from {ran_name}: {e}");
            }
        }
        other => {
            warn!("received unsupported message type {other} from {ran_name}");
        }
    }
}
