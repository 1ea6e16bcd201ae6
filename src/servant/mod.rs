//! # Servant Module
//!
//! ServantProxy is the client-side RPC proxy for calling remote services.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, Ordering};
use std::time::Duration;
use std::collections::HashMap;

use crate::{Result, TarsError, Endpoint};
use crate::protocol::{RequestPacket, ResponsePacket, TarsProtocol};
use crate::selector::HashType;
use crate::manager::EndpointManager;
use crate::transport::TarsClientConfig;
use crate::filter::{Filters, Message};
use crate::stat::StatReporter;
use crate::util::{gen_request_id, Context};
use crate::consts;

/// Default max queue size per object
const DEFAULT_OBJ_QUEUE_MAX: i32 = 10000;

/// ServantProxy for client-side RPC calls
pub struct ServantProxy {
    /// Service name (e.g., "Test.HelloServer.HelloObj")
    name: String,
    /// Protocol handler
    #[allow(dead_code)]
    protocol: Arc<TarsProtocol>,
    /// Endpoint selection and health tracking
    manager: Arc<EndpointManager>,
    /// Client-side filter pipeline
    filters: Filters,
    /// Optional stat sink
    stat: Option<Arc<StatReporter>>,
    /// Timeout in milliseconds
    timeout: AtomicI64,
    /// Protocol version
    version: i16,
    /// In-flight request count for this object, shared with `do_invoke`
    queue_len: Arc<AtomicI32>,
    /// Max in-flight requests before QUEUE_FULL
    obj_queue_max: i32,
    /// Set once the owning process/communicator begins shutting down;
    /// checked before every dispatch.
    shutdown: Arc<AtomicBool>,
}

impl ServantProxy {
    /// Create a new ServantProxy
    pub fn new(name: &str, endpoints: Vec<Endpoint>, config: TarsClientConfig) -> Self {
        let manager = Arc::new(EndpointManager::new(name, "roundrobin", config));
        manager.refresh_endpoints(endpoints);

        Self {
            name: name.to_string(),
            protocol: Arc::new(TarsProtocol::new()),
            manager,
            filters: Filters::new(),
            stat: None,
            timeout: AtomicI64::new(consts::DEFAULT_ASYNC_TIMEOUT as i64),
            version: consts::TARS_VERSION,
            queue_len: Arc::new(AtomicI32::new(0)),
            obj_queue_max: DEFAULT_OBJ_QUEUE_MAX,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attach a stat reporter; calls emit the (access, success, failure)
    /// triple to it.
    pub fn with_stat_reporter(mut self, stat: Arc<StatReporter>) -> Self {
        self.stat = Some(stat);
        self
    }

    /// Share a shutdown flag with the owning communicator. Once set,
    /// `invoke`/`invoke_oneway`/`invoke_hash` refuse new calls with
    /// `TarsError::Shutdown`.
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    /// Attach a callback for application-level server pushes (i.e. not the
    /// reconnect sentinel) received on any adapter backing this proxy.
    pub fn with_push_callback(self, callback: Arc<dyn Fn(Vec<u8>) + Send + Sync>) -> Self {
        self.manager.set_push_callback(callback);
        self
    }

    /// Access the filter pipeline for registration
    pub fn filters_mut(&mut self) -> &mut Filters {
        &mut self.filters
    }

    /// Get service name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set timeout in milliseconds
    pub fn set_timeout(&self, timeout_ms: u64) {
        self.timeout.store(timeout_ms as i64, Ordering::SeqCst);
    }

    /// Get timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.load(Ordering::SeqCst) as u64)
    }

    /// Set protocol version
    pub fn set_version(&mut self, version: i16) {
        self.version = version;
    }

    /// Set the per-servant in-flight bound
    pub fn set_obj_queue_max(&mut self, max: i32) {
        self.obj_queue_max = max;
    }

    /// Refresh endpoints from discovery
    pub fn refresh_endpoints(&self, endpoints: Vec<Endpoint>) {
        self.manager.refresh_endpoints(endpoints);
    }

    /// Invoke a remote method
    pub async fn invoke(
        &self,
        ctx: Context,
        func_name: &str,
        buffer: Vec<u8>,
        status: HashMap<String, String>,
        context: HashMap<String, String>,
    ) -> Result<ResponsePacket> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(TarsError::Shutdown);
        }

        let mut msg = Message::new();

        msg.req.i_version = self.version;
        msg.req.c_packet_type = consts::TARS_NORMAL;
        msg.req.i_request_id = gen_request_id();
        msg.req.s_servant_name = self.name.clone();
        msg.req.s_func_name = func_name.to_string();
        msg.req.s_buffer = buffer;
        msg.req.i_timeout = self.timeout.load(Ordering::SeqCst) as i32;
        msg.req.status = status;
        msg.req.context = context;

        if let Some(dye_key) = ctx.dyeing_key() {
            msg.req
                .status
                .insert(consts::STATUS_DYED_KEY.to_string(), dye_key.to_string());
            msg.req.add_message_type(consts::TARS_MESSAGE_TYPE_DYED);
        }

        if let Some(trace_key) = ctx.trace_key() {
            msg.req
                .status
                .insert(consts::STATUS_TRACE_KEY.to_string(), trace_key.to_string());
            msg.req.add_message_type(consts::TARS_MESSAGE_TYPE_TRACE);
        }

        if let Some(hash) = ctx.client_hash() {
            msg.is_hash = hash.is_hash;
            msg.hash_code = hash.code;
            msg.hash_type = hash.hash_type;
        }

        let mut timeout = self.timeout();
        if let Some(override_timeout) = ctx.client_timeout() {
            if override_timeout.enabled {
                timeout = Duration::from_millis(override_timeout.ms);
                msg.req.i_timeout = override_timeout.ms as i32;
            }
        }

        self.invoke_with_filters(ctx, msg, timeout).await
    }

    /// Invoke with oneway semantics (no response awaited)
    pub async fn invoke_oneway(
        &self,
        _ctx: Context,
        func_name: &str,
        buffer: Vec<u8>,
        status: HashMap<String, String>,
        context: HashMap<String, String>,
    ) -> Result<()> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(TarsError::Shutdown);
        }

        let mut req = RequestPacket::new();
        req.i_version = self.version;
        req.c_packet_type = consts::TARS_ONEWAY;
        req.i_request_id = gen_request_id();
        req.s_servant_name = self.name.clone();
        req.s_func_name = func_name.to_string();
        req.s_buffer = buffer;
        req.i_timeout = self.timeout.load(Ordering::SeqCst) as i32;
        req.status = status;
        req.context = context;

        let msg = Message::with_request(req);
        let (adapter, _probe) = self.manager.select_adapter(&msg).await?;
        adapter.send(&msg.req).await?;
        adapter.success_add();

        Ok(())
    }

    /// Invoke with explicit hash routing
    pub async fn invoke_hash(
        &self,
        ctx: Context,
        func_name: &str,
        buffer: Vec<u8>,
        hash_code: u32,
        hash_type: HashType,
    ) -> Result<ResponsePacket> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(TarsError::Shutdown);
        }

        let mut msg = Message::new();

        msg.req.i_version = self.version;
        msg.req.c_packet_type = consts::TARS_NORMAL;
        msg.req.i_request_id = gen_request_id();
        msg.req.s_servant_name = self.name.clone();
        msg.req.s_func_name = func_name.to_string();
        msg.req.s_buffer = buffer;
        msg.req.i_timeout = self.timeout.load(Ordering::SeqCst) as i32;

        msg.is_hash = true;
        msg.hash_code = hash_code;
        msg.hash_type = hash_type;

        let timeout = self.timeout();
        self.invoke_with_filters(ctx, msg, timeout).await
    }

    /// Run the filter pipeline around `do_invoke`, then emit the stat triple
    /// from the outcome (grounded on `Tars_invoke`, not `doInvoke`).
    async fn invoke_with_filters(
        &self,
        ctx: Context,
        msg: Message,
        timeout: Duration,
    ) -> Result<ResponsePacket> {
        self.manager.pre_invoke();

        let servant = msg.req.s_servant_name.clone();
        let func = msg.req.s_func_name.clone();
        let begin = msg.begin_time;

        let invoke_fn: crate::filter::InvokeFn = {
            let this_manager = Arc::clone(&self.manager);
            let this_queue_len = Arc::clone(&self.queue_len);
            let obj_queue_max = self.obj_queue_max;
            Arc::new(move |ctx, msg, timeout| {
                let manager = Arc::clone(&this_manager);
                let queue_len = Arc::clone(&this_queue_len);
                Box::pin(Self::do_invoke(manager, queue_len, obj_queue_max, ctx, msg, timeout))
            })
        };

        let result = self
            .filters
            .run_client(ctx, msg, invoke_fn, timeout)
            .await;

        self.manager.post_invoke();

        let cost_ms = chrono::Utc::now().timestamp_millis() - begin;
        self.report_stat(&result, &servant, &func, cost_ms);

        result.and_then(|m| {
            let resp = m
                .resp
                .ok_or_else(|| TarsError::Protocol("invoke completed without a response".into()))?;
            if resp.is_success() {
                Ok(resp)
            } else {
                Err(TarsError::RemoteError {
                    code: resp.i_ret,
                    desc: resp.s_result_desc,
                })
            }
        })
    }

    /// Emit the (access, success, failure) triple per §4.8.
    fn report_stat(&self, result: &Result<Message>, servant: &str, func: &str, cost_ms: i64) {
        let Some(ref stat) = self.stat else {
            return;
        };

        match result {
            Err(TarsError::Timeout(_)) => stat.report_timeout(servant, func, "", 0, cost_ms),
            Err(e) => {
                let code = match e {
                    TarsError::RemoteError { code, .. } => *code,
                    _ => -1,
                };
                stat.report_exception(servant, func, "", 0, code, cost_ms);
            }
            Ok(msg) => {
                if let Some(ref resp) = msg.resp {
                    if resp.is_success() {
                        stat.report_success(servant, func, "", 0, cost_ms);
                    } else {
                        stat.report_exception(servant, func, "", 0, resp.i_ret, cost_ms);
                    }
                } else {
                    stat.report_exception(servant, func, "", 0, -1, cost_ms);
                }
            }
        }
    }

    /// `doInvoke`: select an adapter, enforce the in-flight bound, send the
    /// request, and wait for either a response or the deadline.
    ///
    /// The in-flight bound is checked *after* adapter selection, matching
    /// the Go original's ordering rather than the reverse.
    async fn do_invoke(
        manager: Arc<EndpointManager>,
        queue_len: Arc<AtomicI32>,
        obj_queue_max: i32,
        mut ctx: Context,
        msg: Message,
        timeout: Duration,
    ) -> Result<Message> {
        let (adapter, probe) = manager.select_adapter(&msg).await?;

        if queue_len.fetch_add(1, Ordering::SeqCst) + 1 > obj_queue_max {
            queue_len.fetch_sub(1, Ordering::SeqCst);
            return Err(TarsError::QueueFull);
        }
        let _queue_guard = QueueGuard(&queue_len);

        ctx.set_server_ip(adapter.endpoint().host.clone());
        ctx.set_server_port(adapter.endpoint().port);

        let request_id = msg.req.i_request_id;
        let rx = adapter.register_response(request_id);

        if let Err(e) = adapter.send(&msg.req).await {
            adapter.unregister_response(request_id);
            adapter.fail_add();
            return Err(e);
        }

        let mut msg = msg;
        if msg.req.is_oneway() {
            adapter.unregister_response(request_id);
            adapter.success_add();
            msg.finish();
            return Ok(msg);
        }

        let result = tokio::time::timeout(timeout, rx).await;
        adapter.unregister_response(request_id);

        match result {
            Ok(Ok(resp)) => {
                adapter.success_add();
                if probe {
                    let endpoint = adapter.endpoint().clone();
                    let adapter = Arc::clone(&adapter);
                    let manager = Arc::clone(&manager);
                    tokio::spawn(async move {
                        adapter.reset();
                        manager.add_alive_ep(endpoint);
                    });
                }
                msg.resp = Some(resp);
                msg.finish();
                Ok(msg)
            }
            Ok(Err(_)) => {
                adapter.fail_add();
                Err(TarsError::ConnectionClosed)
            }
            Err(_) => {
                adapter.fail_add();
                Err(TarsError::Timeout(timeout.as_millis() as u64))
            }
        }
    }
}

/// Decrements the shared queue counter when a `do_invoke` call exits, by any path.
struct QueueGuard<'a>(&'a Arc<AtomicI32>);

impl Drop for QueueGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_servant_proxy_creation() {
        let endpoints = vec![Endpoint::tcp("127.0.0.1", 10000)];
        let config = TarsClientConfig::tcp();
        let proxy = ServantProxy::new("Test.HelloServer.HelloObj", endpoints, config);

        assert_eq!(proxy.name(), "Test.HelloServer.HelloObj");
    }

    #[tokio::test]
    async fn test_servant_proxy_timeout() {
        let endpoints = vec![Endpoint::tcp("127.0.0.1", 10000)];
        let config = TarsClientConfig::tcp();
        let proxy = ServantProxy::new("Test.HelloServer.HelloObj", endpoints, config);

        proxy.set_timeout(5000);
        assert_eq!(proxy.timeout(), Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_invoke_queue_full() {
        let endpoints = vec![Endpoint::tcp("127.0.0.1", 10000)];
        let mut proxy = ServantProxy::new("Test.HelloServer.HelloObj", endpoints, TarsClientConfig::tcp());
        proxy.set_obj_queue_max(0);

        let result = proxy
            .invoke(Context::new(), "echo", vec![], HashMap::new(), HashMap::new())
            .await;

        assert!(matches!(result, Err(TarsError::QueueFull)));
    }

    #[tokio::test]
    async fn test_invoke_refuses_after_shutdown() {
        let endpoints = vec![Endpoint::tcp("127.0.0.1", 10000)];
        let flag = Arc::new(AtomicBool::new(false));
        let proxy = ServantProxy::new("Test.HelloServer.HelloObj", endpoints, TarsClientConfig::tcp())
            .with_shutdown_flag(Arc::clone(&flag));

        flag.store(true, Ordering::SeqCst);

        let result = proxy
            .invoke(Context::new(), "echo", vec![], HashMap::new(), HashMap::new())
            .await;
        assert!(matches!(result, Err(TarsError::Shutdown)));

        let oneway_result = proxy
            .invoke_oneway(Context::new(), "echo", vec![], HashMap::new(), HashMap::new())
            .await;
        assert!(matches!(oneway_result, Err(TarsError::Shutdown)));
    }

    #[tokio::test]
    async fn test_with_push_callback_registers_on_manager() {
        let endpoints = vec![Endpoint::tcp("127.0.0.1", 10000)];
        let received: Arc<parking_lot::Mutex<Option<Vec<u8>>>> =
            Arc::new(parking_lot::Mutex::new(None));
        let received_clone = Arc::clone(&received);
        let proxy = ServantProxy::new("Test.HelloServer.HelloObj", endpoints, TarsClientConfig::tcp())
            .with_push_callback(Arc::new(move |buf: Vec<u8>| {
                *received_clone.lock() = Some(buf);
            }));

        let msg = crate::filter::Message::new();
        let (adapter, _) = proxy.manager.select_adapter(&msg).await.unwrap();

        let mut resp = ResponsePacket::default();
        resp.i_request_id = 0;
        resp.s_buffer = vec![9, 9, 9];
        adapter.handle_response(resp);

        assert_eq!(received.lock().clone(), Some(vec![9, 9, 9]));
    }

    #[tokio::test]
    async fn test_invoke_no_endpoint() {
        let proxy = ServantProxy::new("Test.HelloServer.HelloObj", vec![], TarsClientConfig::tcp());

        let result = proxy
            .invoke(Context::new(), "echo", vec![], HashMap::new(), HashMap::new())
            .await;

        assert!(matches!(result, Err(TarsError::NoEndpoint)));
    }
}
