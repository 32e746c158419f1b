pub mod cards;
pub mod sets;

use crate::admission::RequestGovernor;
use crate::transport::Transport;
use std::sync::Arc;
use tcg_core::Result;
use tokio_util::sync::CancellationToken;

/// Base trait for endpoint implementations
///
/// Provides common functionality needed by all endpoint modules
pub trait EndpointBase {
  /// Wait for a rate slot and reserve one unit of quota before a request
  async fn admit(&self, cancel: &CancellationToken) -> Result<()>;

  /// Get a reference to the transport layer
  fn transport(&self) -> &Arc<Transport>;
}

/// Macro to implement the EndpointBase trait for endpoint structs
macro_rules! impl_endpoint_base {
  ($struct_name:ident) => {
    impl EndpointBase for $struct_name {
      async fn admit(&self, cancel: &CancellationToken) -> Result<()> {
        self.governor.admit(cancel).await
      }

      fn transport(&self) -> &Arc<Transport> {
        &self.transport
      }
    }
  };
}

pub(crate) use impl_endpoint_base;

/// Common endpoint structure
///
/// All endpoint modules follow this pattern with a transport layer
/// and the shared request governor.
#[derive(Clone)]
pub struct EndpointCore {
  pub transport: Arc<Transport>,
  pub governor: Arc<RequestGovernor>,
}

impl EndpointCore {
  /// Create a new endpoint core
  pub fn new(transport: Arc<Transport>, governor: Arc<RequestGovernor>) -> Self {
    Self { transport, governor }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::quota::QuotaGovernor;
  use std::time::Duration;
  use tcg_core::SystemClock;

  #[test]
  fn test_endpoint_core_creation() {
    let transport = Arc::new(Transport::new_mock());
    let quota = Arc::new(QuotaGovernor::new(100, None, Arc::new(SystemClock)));
    let governor = Arc::new(RequestGovernor::from_parts(quota, 10, Duration::from_secs(30)));

    let core = EndpointCore::new(transport, governor);

    assert_eq!(core.transport.base_url(), "https://mock.justtcg.com/v1");
    assert_eq!(core.governor.quota().daily_limit(), 100);
  }
}
