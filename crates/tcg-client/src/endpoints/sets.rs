use super::{impl_endpoint_base, EndpointBase, EndpointCore};
use crate::admission::RequestGovernor;
use crate::transport::Transport;
use std::sync::Arc;
use tcg_core::Result;
use tcg_models::ProviderCard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// One page of a set listing
#[derive(Debug, Clone, PartialEq)]
pub struct SetPage {
  pub cards: Vec<ProviderCard>,
  pub has_more: bool,
}

/// Set listing endpoints, used to discover provider identifiers in bulk
pub struct SetEndpoints {
  transport: Arc<Transport>,
  governor: Arc<RequestGovernor>,
}

impl SetEndpoints {
  /// Create a new set endpoints instance
  pub fn new(core: EndpointCore) -> Self {
    Self { transport: core.transport, governor: core.governor }
  }

  /// Fetch one page of a set listing, using one unit of quota
  ///
  /// # Arguments
  ///
  /// * `set_key` - The provider's own set key, e.g. `base-set-pokemon`
  /// * `offset` - Index of the first card on the page
  /// * `page_size` - Cards per page
  ///
  /// When the provider omits pagination metadata, a full page is taken to
  /// mean there may be more.
  #[instrument(skip(self, cancel))]
  pub async fn fetch_set_page(
    &self,
    set_key: &str,
    offset: usize,
    page_size: usize,
    cancel: &CancellationToken,
  ) -> Result<SetPage> {
    self.admit(cancel).await?;

    let params = [
      ("set", set_key.to_string()),
      ("limit", page_size.to_string()),
      ("offset", offset.to_string()),
      ("include_price_history", "false".to_string()),
    ];

    let response = self
      .transport()
      .get::<Vec<ProviderCard>>("cards", &params, self.transport.set_timeout())
      .await?;
    self.governor.absorb_usage(response.usage.as_ref());

    let has_more_meta = response.meta.as_ref().map(|m| m.has_more);
    let cards = response.data.unwrap_or_default();
    let has_more = match has_more_meta {
      Some(flag) => flag && !cards.is_empty(),
      None => page_size > 0 && cards.len() >= page_size,
    };

    debug!("set {} offset {}: {} cards, has_more={}", set_key, offset, cards.len(), has_more);
    Ok(SetPage { cards, has_more })
  }
}

impl_endpoint_base!(SetEndpoints);
