use std::path::PathBuf;

use crate::cmms::cached_client::CachedCmmsClient;
use crate::cmms::transport::{HttpTransport, Transport};
use crate::ui::components::Notifier;

/// What every view gets handed: the cached client, the shared notifier and
/// where downloads go.
#[derive(Clone)]
pub struct ViewContext<T: Transport = HttpTransport> {
  pub client: CachedCmmsClient<T>,
  pub notifier: Notifier,
  pub downloads_dir: PathBuf,
}

impl<T: Transport> ViewContext<T> {
  pub fn new(client: CachedCmmsClient<T>, notifier: Notifier, downloads_dir: PathBuf) -> Self {
    Self {
      client,
      notifier,
      downloads_dir,
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::cmms::cached_client::tests::cached_client;
  use crate::cmms::fake::FakeBackend;
  use std::time::Duration;

  pub(crate) fn test_context(backend: &FakeBackend) -> ViewContext<FakeBackend> {
    ViewContext::new(cached_client(backend), Notifier::new(), std::env::temp_dir())
  }

  /// Let spawned requests finish, then tick `view` so it picks up results.
  pub(crate) async fn settle(view: &mut dyn crate::ui::view::View) {
    for _ in 0..5 {
      tokio::time::sleep(Duration::from_millis(10)).await;
      view.tick();
    }
  }
}
