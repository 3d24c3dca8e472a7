//! Serialized, open-per-call access to one terminal

use tokio::sync::Mutex;
use tracing::{debug, warn};

use tlpay_core::{Frame, Requests};
use tlpay_transport::Transport;
use tlpay_types::{ApproveRequest, CancelRequest};

use crate::{client::Client, error::Result};

/// Terminal gateway
///
/// At most one exchange runs at a time; callers queue on a FIFO lock. The
/// transport is opened right before each exchange and closed right after
/// it, whether or not the exchange succeeded.
///
/// # Examples
///
/// ```no_run
/// use tlpay::{Client, ClientConfig, Gateway, Requests};
/// use tlpay_transport::TcpTransport;
///
/// #[tokio::main]
/// async fn main() -> tlpay::Result<()> {
///     let transport = TcpTransport::new("192.168.0.50", 4001);
///     let gateway = Gateway::new(
///         Client::new(transport, ClientConfig::default()),
///         Requests::new("CAT0001"),
///     );
///
///     let reply = gateway.device_check().await?;
///     println!("{}", tlpay::FrameSummary::from(&reply));
///     Ok(())
/// }
/// ```
pub struct Gateway<T: Transport> {
    client: Mutex<Client<T>>,
    requests: Requests,
}

impl<T: Transport> Gateway<T> {
    /// Create a gateway around a client and a request factory
    pub fn new(client: Client<T>, requests: Requests) -> Self {
        Self {
            client: Mutex::new(client),
            requests,
        }
    }

    /// Request factory in use
    pub fn requests(&self) -> &Requests {
        &self.requests
    }

    /// Device check (`A` → `a`)
    pub async fn device_check(&self) -> Result<Frame> {
        self.call(|requests| requests.device_check()).await
    }

    /// Approval (`B` → `b`)
    ///
    /// Fields are sent as given; oversized values are truncated by the
    /// payload builder. Use [`ApproveRequest::validate`] to reject them
    /// up front.
    pub async fn approve(&self, request: &ApproveRequest) -> Result<Frame> {
        self.call(|requests| requests.approve(&request.as_approval())).await
    }

    /// Cancellation (`C` → `c`)
    pub async fn cancel(&self, request: &CancelRequest) -> Result<Frame> {
        self.call(|requests| requests.cancel(&request.as_cancellation())).await
    }

    async fn call<F>(&self, build: F) -> Result<Frame>
    where
        F: FnOnce(&Requests) -> tlpay_core::Result<Frame>,
    {
        let mut client = self.client.lock().await;

        client.open().await?;

        let result = match build(&self.requests) {
            Ok(request) => client.request_response(&request).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = client.close().await {
            warn!("Failed to close transport: {}", e);
        }

        match &result {
            Ok(frame) => debug!(job = %frame.job, "Exchange complete"),
            Err(e) => warn!(reason = e.reason(), "Exchange failed: {}", e),
        }
        result
    }
}
