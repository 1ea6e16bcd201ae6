//! # Filter Module
//!
//! Request filter/middleware support for client and server.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::Result;
use crate::protocol::{RequestPacket, ResponsePacket};
use crate::util::Context;

/// Message for filter chain
#[derive(Clone)]
pub struct Message {
    /// Request packet
    pub req: RequestPacket,
    /// Response packet
    pub resp: Option<ResponsePacket>,
    /// Begin time (unix ms)
    pub begin_time: i64,
    /// End time (unix ms)
    pub end_time: i64,
    /// Status code
    pub status: i32,
    /// Hash code for hash-based routing
    pub hash_code: u32,
    /// Hash type
    pub hash_type: crate::selector::HashType,
    /// Is hash-based call
    pub is_hash: bool,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    pub fn new() -> Self {
        Self {
            req: RequestPacket::new(),
            resp: None,
            begin_time: chrono::Utc::now().timestamp_millis(),
            end_time: 0,
            status: 0,
            hash_code: 0,
            hash_type: crate::selector::HashType::ModHash,
            is_hash: false,
        }
    }

    pub fn with_request(req: RequestPacket) -> Self {
        Self {
            req,
            ..Self::new()
        }
    }

    pub fn finish(&mut self) {
        self.end_time = chrono::Utc::now().timestamp_millis();
    }

    pub fn elapsed_ms(&self) -> i64 {
        if self.end_time > 0 {
            self.end_time - self.begin_time
        } else {
            chrono::Utc::now().timestamp_millis() - self.begin_time
        }
    }
}

impl crate::selector::Message for Message {
    fn hash_code(&self) -> u32 {
        self.hash_code
    }

    fn hash_type(&self) -> crate::selector::HashType {
        self.hash_type
    }

    fn is_hash(&self) -> bool {
        self.is_hash
    }
}

/// Client invoke function type
pub type InvokeFn = Arc<
    dyn Fn(Context, Message, Duration) -> Pin<Box<dyn Future<Output = Result<Message>> + Send>>
        + Send
        + Sync,
>;

/// Client filter function
pub type ClientFilter = Arc<
    dyn Fn(
            Context,
            Message,
            InvokeFn,
            Duration,
        ) -> Pin<Box<dyn Future<Output = Result<Message>> + Send>>
        + Send
        + Sync,
>;

/// Server dispatch function type
pub type DispatchFn = Arc<
    dyn Fn(Context, Arc<dyn std::any::Any + Send + Sync>, RequestPacket, bool) -> Pin<Box<dyn Future<Output = Result<ResponsePacket>> + Send>>
        + Send
        + Sync,
>;

/// Server filter function
pub type ServerFilter = Arc<
    dyn Fn(
            Context,
            DispatchFn,
            Arc<dyn std::any::Any + Send + Sync>,
            RequestPacket,
            bool,
        ) -> Pin<Box<dyn Future<Output = Result<ResponsePacket>> + Send>>
        + Send
        + Sync,
>;

/// Filter chain management.
///
/// Exactly two composition modes, mutually exclusive per process: chain mode
/// (`client_filter`/`server_filter` set) where a single wrapper is
/// responsible for calling `next`, and list mode (`pre_*`/`post_*`) where
/// ordered filters run around the invocation. Registering a chain filter and
/// list filters on the same `Filters` is a configuration error the caller
/// should avoid; `run_client`/`run_server` simply prefer chain mode when set.
#[derive(Default)]
pub struct Filters {
    /// Chain-mode client filter (`cf`)
    pub client_filter: Option<ClientFilter>,
    /// List-mode pre-invoke client filters
    pub pre_client_filters: Vec<ClientFilter>,
    /// List-mode post-invoke client filters
    pub post_client_filters: Vec<ClientFilter>,
    /// Chain-mode server filter (`cf`)
    pub server_filter: Option<ServerFilter>,
    /// List-mode pre-invoke server filters
    pub pre_server_filters: Vec<ServerFilter>,
    /// List-mode post-invoke server filters
    pub post_server_filters: Vec<ServerFilter>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the chain-mode client filter
    pub fn register_client_filter(&mut self, filter: ClientFilter) {
        self.client_filter = Some(filter);
    }

    /// Register a list-mode pre-invoke client filter
    pub fn register_pre_client_filter(&mut self, filter: ClientFilter) {
        self.pre_client_filters.push(filter);
    }

    /// Register a list-mode post-invoke client filter
    pub fn register_post_client_filter(&mut self, filter: ClientFilter) {
        self.post_client_filters.push(filter);
    }

    /// Register the chain-mode server filter
    pub fn register_server_filter(&mut self, filter: ServerFilter) {
        self.server_filter = Some(filter);
    }

    /// Register a list-mode pre-invoke server filter
    pub fn register_pre_server_filter(&mut self, filter: ServerFilter) {
        self.pre_server_filters.push(filter);
    }

    /// Register a list-mode post-invoke server filter
    pub fn register_post_server_filter(&mut self, filter: ServerFilter) {
        self.post_server_filters.push(filter);
    }

    /// True when chain mode is configured for the client side
    pub fn is_client_chain_mode(&self) -> bool {
        self.client_filter.is_some()
    }

    /// Run the client-side pipeline around `invoke`, in whichever mode is
    /// configured. Pre-filter errors are logged and do not abort the call;
    /// only `invoke` itself can fail it.
    pub async fn run_client(
        &self,
        ctx: Context,
        msg: Message,
        invoke: InvokeFn,
        timeout: Duration,
    ) -> Result<Message> {
        if let Some(ref cf) = self.client_filter {
            return cf(ctx, msg, invoke, timeout).await;
        }

        let mut msg = msg;
        for pre in &self.pre_client_filters {
            match pre(ctx.clone(), msg.clone(), invoke.clone(), timeout).await {
                Ok(next_msg) => msg = next_msg,
                Err(e) => tracing::warn!("pre-invoke client filter error: {}", e),
            }
        }

        let mut result = invoke(ctx.clone(), msg, timeout).await?;

        for post in &self.post_client_filters {
            match post(ctx.clone(), result.clone(), invoke.clone(), timeout).await {
                Ok(next_msg) => result = next_msg,
                Err(e) => tracing::warn!("post-invoke client filter error: {}", e),
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message() {
        let mut msg = Message::new();
        assert!(msg.begin_time > 0);
        assert_eq!(msg.end_time, 0);

        msg.finish();
        assert!(msg.end_time >= msg.begin_time);
    }

    #[test]
    fn test_filters_default_is_list_mode() {
        let filters = Filters::new();
        assert!(!filters.is_client_chain_mode());
    }

    #[tokio::test]
    async fn test_run_client_list_mode_runs_pre_and_post() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let mut filters = Filters::new();
        let pre_ran = Arc::new(AtomicU32::new(0));
        let post_ran = Arc::new(AtomicU32::new(0));

        {
            let pre_ran = Arc::clone(&pre_ran);
            filters.register_pre_client_filter(Arc::new(move |_ctx, msg, _invoke, _timeout| {
                pre_ran.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { Ok(msg) })
            }));
        }
        {
            let post_ran = Arc::clone(&post_ran);
            filters.register_post_client_filter(Arc::new(move |_ctx, msg, _invoke, _timeout| {
                post_ran.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { Ok(msg) })
            }));
        }

        let invoke: InvokeFn = Arc::new(|_ctx, mut msg, _timeout| {
            msg.status = 1;
            Box::pin(async move { Ok(msg) })
        });

        let result = filters
            .run_client(Context::new(), Message::new(), invoke, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(result.status, 1);
        assert_eq!(pre_ran.load(Ordering::SeqCst), 1);
        assert_eq!(post_ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_client_chain_mode_skips_list_filters() {
        let mut filters = Filters::new();
        filters.register_pre_client_filter(Arc::new(|_ctx, _msg, _invoke, _timeout| {
            panic!("list-mode filter must not run when chain mode is configured");
        }));
        filters.register_client_filter(Arc::new(|ctx, msg, invoke, timeout| {
            Box::pin(async move { invoke(ctx, msg, timeout).await })
        }));

        let invoke: InvokeFn = Arc::new(|_ctx, mut msg, _timeout| {
            msg.status = 7;
            Box::pin(async move { Ok(msg) })
        });

        let result = filters
            .run_client(Context::new(), Message::new(), invoke, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(result.status, 7);
    }
}
