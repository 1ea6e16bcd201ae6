//! # Adapter Module
//!
//! AdapterProxy manages a connection to a single service endpoint.

use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, Ordering};
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::{Endpoint, Result};
use crate::protocol::{RequestPacket, ResponsePacket, Protocol, TarsProtocol};
use crate::transport::{TarsClient, TarsClientConfig, ClientProtocol};
use crate::codec::PackageStatus;
use crate::consts;

/// AdapterProxy manages connection to a single endpoint
pub struct AdapterProxy {
    /// Endpoint information
    endpoint: Endpoint,
    /// Transport client, replaced wholesale on a reconnect push
    client: RwLock<Arc<TarsClient>>,
    /// Config used to build the current and any replacement client
    client_config: TarsClientConfig,
    /// Protocol handler
    protocol: Arc<TarsProtocol>,
    /// Response channels: request_id -> response sender
    responses: DashMap<i32, oneshot::Sender<ResponsePacket>>,
    /// Fail count
    fail_count: AtomicI32,
    /// Last fail count (consecutive)
    last_fail_count: AtomicI32,
    /// Send count
    send_count: AtomicI32,
    /// Success count
    success_count: AtomicI32,
    /// Last success time (unix seconds)
    last_success_time: AtomicI64,
    /// Last block time
    last_block_time: AtomicI64,
    /// Last check time
    last_check_time: AtomicI64,
    /// Status: true = active
    status: AtomicBool,
    /// Closed flag
    closed: AtomicBool,
    /// Push callback, invoked for pushes that aren't the reconnect sentinel
    push_callback: Option<Arc<dyn Fn(Vec<u8>) + Send + Sync>>,
}

impl AdapterProxy {
    /// Create a new AdapterProxy
    pub fn new(endpoint: Endpoint, config: TarsClientConfig) -> Arc<Self> {
        Self::with_push_callback(endpoint, config, None)
    }

    /// Create a new AdapterProxy with a callback invoked for server pushes
    /// that aren't the reconnect sentinel (see [`Self::handle_push`]).
    pub fn with_push_callback(
        endpoint: Endpoint,
        config: TarsClientConfig,
        push_callback: Option<Arc<dyn Fn(Vec<u8>) + Send + Sync>>,
    ) -> Arc<Self> {
        let protocol = Arc::new(TarsProtocol::new());
        let address = endpoint.address();

        Arc::new_cyclic(|weak: &Weak<Self>| {
            let client = TarsClient::new(
                &address,
                Arc::new(AdapterProtocolHandler::new(weak.clone())),
                config.clone(),
            );

            Self {
                endpoint,
                client: RwLock::new(client),
                client_config: config,
                protocol,
                responses: DashMap::new(),
                fail_count: AtomicI32::new(0),
                last_fail_count: AtomicI32::new(0),
                send_count: AtomicI32::new(0),
                success_count: AtomicI32::new(0),
                last_success_time: AtomicI64::new(now_secs()),
                last_block_time: AtomicI64::new(now_secs()),
                last_check_time: AtomicI64::new(now_secs()),
                status: AtomicBool::new(true),
                closed: AtomicBool::new(false),
                push_callback,
            }
        })
    }

    /// Get endpoint
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Check if adapter is active
    pub fn is_active(&self) -> bool {
        self.status.load(Ordering::SeqCst)
    }

    /// Check if adapter is closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a request
    pub async fn send(&self, req: &RequestPacket) -> Result<()> {
        self.send_count.fetch_add(1, Ordering::SeqCst);

        let data = self.protocol.request_pack(req)?;
        let client = self.client.read().clone();
        client.send(data).await?;

        Ok(())
    }

    /// Register response channel
    pub fn register_response(&self, request_id: i32) -> oneshot::Receiver<ResponsePacket> {
        let (tx, rx) = oneshot::channel();
        self.responses.insert(request_id, tx);
        rx
    }

    /// Unregister response channel
    pub fn unregister_response(&self, request_id: i32) {
        self.responses.remove(&request_id);
    }

    /// Handle received response
    pub fn handle_response(self: &Arc<Self>, response: ResponsePacket) {
        if response.i_request_id == 0 {
            // Server push
            self.handle_push(response);
            return;
        }

        if response.is_oneway() {
            debug!("Discarding oneway-typed response for request {}", response.i_request_id);
            return;
        }

        if let Some((_, tx)) = self.responses.remove(&response.i_request_id) {
            let _ = tx.send(response);
        } else {
            debug!("No handler for request {}", response.i_request_id);
        }
    }

    /// Handle server push: either the reconnect sentinel or an application push
    fn handle_push(self: &Arc<Self>, response: ResponsePacket) {
        if response.s_result_desc == consts::RECONNECT_MSG {
            debug!("Received reconnect message from {}", self.endpoint.address());
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.handle_reconnect_sentinel().await;
            });
            return;
        }

        if let Some(ref callback) = self.push_callback {
            callback(response.s_buffer.clone());
        }
    }

    /// Build a replacement TarsClient and gracefully close the old one.
    ///
    /// Grounded on the Go original's `onPush`: a fresh client is swapped in
    /// immediately so in-flight callers keep working, and the old client is
    /// given `idle_timeout` to drain before it is forced closed.
    async fn handle_reconnect_sentinel(self: Arc<Self>) {
        let address = self.endpoint.address();
        let new_client = TarsClient::new(
            &address,
            Arc::new(AdapterProtocolHandler::new(Arc::downgrade(&self))),
            self.client_config.clone(),
        );

        let old_client = {
            let mut guard = self.client.write();
            std::mem::replace(&mut *guard, new_client)
        };

        info!("Reconnecting adapter for {}", address);
        let deadline = self.client_config.idle_timeout;
        old_client.graceful_close(deadline).await;
    }

    /// Record success
    pub fn success_add(&self) {
        self.last_success_time.store(now_secs(), Ordering::SeqCst);
        self.success_count.fetch_add(1, Ordering::SeqCst);
        self.last_fail_count.store(0, Ordering::SeqCst);
    }

    /// Record failure
    pub fn fail_add(&self) {
        self.last_fail_count.fetch_add(1, Ordering::SeqCst);
        self.fail_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Check and update active status, reconnecting when probing a blocked
    /// endpoint.
    /// Returns (first_time_inactive, need_check)
    pub async fn check_active(&self) -> (bool, bool) {
        if self.closed.load(Ordering::SeqCst) {
            return (false, false);
        }

        let now = now_secs();
        let breaker = &self.client_config.breaker;

        if self.status.load(Ordering::SeqCst) {
            // Active status
            let last_success = self.last_success_time.load(Ordering::SeqCst);
            let last_fail_count = self.last_fail_count.load(Ordering::SeqCst);

            // Check consecutive failures within interval
            if (now - last_success) >= breaker.fail_interval.as_secs() as i64
                && last_fail_count >= breaker.fail_n
            {
                self.status.store(false, Ordering::SeqCst);
                self.last_block_time.store(now, Ordering::SeqCst);
                return (true, false);
            }

            // Periodic check
            let last_check = self.last_check_time.load(Ordering::SeqCst);
            if (now - last_check) >= breaker.check_interval.as_secs() as i64 {
                self.last_check_time.store(now, Ordering::SeqCst);

                let fail_count = self.fail_count.load(Ordering::SeqCst);
                let send_count = self.send_count.load(Ordering::SeqCst);

                // Check failure ratio
                if fail_count >= breaker.over_n
                    && send_count > 0
                    && (fail_count as f32 / send_count as f32) >= breaker.fail_ratio
                {
                    self.status.store(false, Ordering::SeqCst);
                    self.last_block_time.store(now, Ordering::SeqCst);
                    return (true, false);
                }
            }

            return (false, false);
        }

        // Inactive status - check if we should try to reactivate
        let last_block = self.last_block_time.load(Ordering::SeqCst);
        if (now - last_block) >= breaker.try_interval.as_secs() as i64 {
            self.last_block_time.store(now, Ordering::SeqCst);

            let client = self.client.read().clone();
            if let Err(e) = client.reconnect().await {
                warn!("Reconnect probe failed for {}: {}", self.endpoint.address(), e);
                return (false, false);
            }
            return (false, true);
        }

        (false, false)
    }

    /// Reset statistics
    pub fn reset(&self) {
        let now = now_secs();
        self.send_count.store(0, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
        self.fail_count.store(0, Ordering::SeqCst);
        self.last_fail_count.store(0, Ordering::SeqCst);
        self.last_block_time.store(now, Ordering::SeqCst);
        self.last_check_time.store(now, Ordering::SeqCst);
        self.status.store(true, Ordering::SeqCst);
    }

    /// Close the adapter
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.client.read().close();
    }

    /// Number of requests awaiting a response on this adapter.
    pub fn in_flight_count(&self) -> usize {
        self.responses.len()
    }

    /// Close once the in-flight table drains, or after `deadline` elapses,
    /// whichever comes first. Used when an endpoint is dropped from the
    /// alive set so requests already sent to it can still complete.
    pub async fn graceful_close(self: Arc<Self>, deadline: std::time::Duration) {
        let deadline_at = tokio::time::Instant::now() + deadline;
        loop {
            if self.in_flight_count() == 0 || tokio::time::Instant::now() >= deadline_at {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        self.close();
    }
}

/// Get current time in seconds
fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Protocol handler for adapter: decodes a raw frame and hands the decoded
/// response back to the owning AdapterProxy via a weak reference, avoiding a
/// true Arc cycle between the proxy and its transport client.
struct AdapterProtocolHandler {
    owner: Weak<AdapterProxy>,
    protocol: TarsProtocol,
}

impl AdapterProtocolHandler {
    fn new(owner: Weak<AdapterProxy>) -> Self {
        Self {
            owner,
            protocol: TarsProtocol::new(),
        }
    }
}

impl ClientProtocol for AdapterProtocolHandler {
    fn parse_package(&self, buff: &[u8]) -> (usize, PackageStatus) {
        crate::codec::parse_package(buff)
    }

    fn recv(&self, pkg: Vec<u8>) {
        let Some(owner) = self.owner.upgrade() else {
            return;
        };

        match self.protocol.response_unpack(&pkg) {
            Ok(response) => owner.handle_response(response),
            Err(e) => debug!("Failed to decode response: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_adapter_proxy_creation() {
        let endpoint = Endpoint::tcp("127.0.0.1", 10000);
        let config = TarsClientConfig::tcp();
        let adapter = AdapterProxy::new(endpoint, config);

        assert!(adapter.is_active());
        assert!(!adapter.is_closed());
    }

    #[tokio::test]
    async fn test_adapter_statistics() {
        let endpoint = Endpoint::tcp("127.0.0.1", 10000);
        let config = TarsClientConfig::tcp();
        let adapter = AdapterProxy::new(endpoint, config);

        adapter.success_add();
        adapter.success_add();
        adapter.fail_add();

        assert_eq!(adapter.success_count.load(Ordering::SeqCst), 2);
        assert_eq!(adapter.fail_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handle_response_delivers_to_waiter() {
        let endpoint = Endpoint::tcp("127.0.0.1", 10000);
        let config = TarsClientConfig::tcp();
        let adapter = AdapterProxy::new(endpoint, config);

        let rx = adapter.register_response(7);

        let mut resp = ResponsePacket::default();
        resp.i_request_id = 7;
        resp.i_ret = 0;
        adapter.handle_response(resp);

        let delivered = rx.await.expect("response should be delivered");
        assert_eq!(delivered.i_request_id, 7);
    }

    #[tokio::test]
    async fn test_handle_push_reconnect_sentinel_swaps_client() {
        let endpoint = Endpoint::tcp("127.0.0.1", 10000);
        let config = TarsClientConfig::tcp();
        let adapter = AdapterProxy::new(endpoint, config);

        let mut resp = ResponsePacket::default();
        resp.i_request_id = 0;
        resp.s_result_desc = consts::RECONNECT_MSG.to_string();
        adapter.handle_response(resp);

        // The swap runs on a detached task; give it a moment to run.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!adapter.is_closed());
    }

    #[tokio::test]
    async fn test_handle_response_discards_oneway() {
        let endpoint = Endpoint::tcp("127.0.0.1", 10000);
        let config = TarsClientConfig::tcp();
        let adapter = AdapterProxy::new(endpoint, config);

        let rx = adapter.register_response(9);

        let mut resp = ResponsePacket::default();
        resp.i_request_id = 9;
        resp.c_packet_type = consts::TARS_ONEWAY;
        adapter.handle_response(resp);

        // Discarded rather than delivered: the sender was dropped, not used.
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_handle_push_invokes_callback() {
        let endpoint = Endpoint::tcp("127.0.0.1", 10000);
        let config = TarsClientConfig::tcp();
        let received: Arc<parking_lot::Mutex<Option<Vec<u8>>>> = Arc::new(parking_lot::Mutex::new(None));
        let received_clone = Arc::clone(&received);
        let adapter = AdapterProxy::with_push_callback(
            endpoint,
            config,
            Some(Arc::new(move |buf: Vec<u8>| {
                *received_clone.lock() = Some(buf);
            })),
        );

        let mut resp = ResponsePacket::default();
        resp.i_request_id = 0;
        resp.s_buffer = vec![1, 2, 3];
        adapter.handle_response(resp);

        assert_eq!(received.lock().clone(), Some(vec![1, 2, 3]));
    }
}
