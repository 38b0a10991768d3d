//! Desktop notifications via the freedesktop notification service.

use calwake_core::{NotificationKind, NotificationPayload, NotificationPort};
use chrono::Local;
use log::debug;
use notify_rust::{Notification, NotificationHandle, Timeout, Urgency};

/// Renders the core's two notification surfaces as desktop notifications.
///
/// The live display keeps its handle so a refresh replaces it in place and
/// a cancel closes it; full alerts are fire-and-forget.
#[derive(Default)]
pub struct DesktopNotifier {
    live: Option<NotificationHandle>,
}

fn time_range(payload: &NotificationPayload) -> String {
    if payload.all_day {
        "All Day".to_string()
    } else {
        format!(
            "{} - {}",
            payload.start.with_timezone(&Local).format("%H:%M"),
            payload.end.with_timezone(&Local).format("%H:%M")
        )
    }
}

impl NotificationPort for DesktopNotifier {
    fn show(
        &mut self,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match kind {
            NotificationKind::LiveOngoing => {
                if let Some(previous) = self.live.take() {
                    previous.close();
                }
                let handle = Notification::new()
                    .appname("calwake")
                    .summary(&payload.title)
                    .body(&time_range(payload))
                    .timeout(Timeout::Never)
                    .show()?;
                self.live = Some(handle);
            }
            NotificationKind::FullAlert => {
                Notification::new()
                    .appname("calwake")
                    .summary(&payload.title)
                    .body("Starting now")
                    .urgency(Urgency::Critical)
                    .show()?;
            }
        }
        Ok(())
    }

    fn cancel(&mut self, kind: NotificationKind, event_id: i64) {
        match kind {
            NotificationKind::LiveOngoing => {
                if let Some(handle) = self.live.take() {
                    handle.close();
                }
            }
            NotificationKind::FullAlert => {
                // One-shot alerts carry no handle across processes; the
                // desktop dismisses them with the user.
                debug!("dismiss requested for alert of event {event_id}");
            }
        }
    }
}
