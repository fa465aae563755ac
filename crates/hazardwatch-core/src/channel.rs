// ── Notification channel seam ──
//
// The engine decides when and what to notify; a `NotificationChannel`
// implementation does the actual showing, ringing or pushing. Futures are
// boxed so heterogeneous channels can live behind `Arc<dyn _>`.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::error::CoreError;
use crate::model::{ChannelKind, Notification, Permission};

pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Current permission state. Queried by the dispatcher before the first
    /// delivery; anything other than `Granted` keeps the channel silent.
    fn permission(&self) -> BoxFuture<'_, Permission> {
        futures_util::future::ready(Permission::Granted).boxed()
    }

    /// Ask the operator for permission. Defaults to the current state for
    /// channels that are not permission-gated.
    fn request_permission(&self) -> BoxFuture<'_, Permission> {
        self.permission()
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), CoreError>>;
}
