// pool.rs: Central event loop driving the player from intents, widget callbacks and timers

use crate::event::{Event, Intent, process_event};
use crate::player::PlayerController;
use crate::widget::{VideoWidget, WidgetEvent};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// Runs the player until shutdown (or until the intent channel closes) and
/// hands it back afterwards.
///
/// Each iteration first runs whatever scheduled work is due, then waits for
/// the earliest of: a shutdown signal, a widget callback, a user intent, the
/// next scheduled deadline, or `poll_interval` (used to let widgets without
/// their own event source report state such as end of track).
pub async fn listen<W: VideoWidget>(
    mut player: PlayerController<W>,
    mut intents: mpsc::UnboundedReceiver<Intent>,
    mut widget_events: mpsc::UnboundedReceiver<WidgetEvent>,
    mut shutdown_rx: mpsc::Receiver<()>,
    poll_interval: Duration,
) -> PlayerController<W> {
    loop {
        player.run_due_tasks();
        let poll_at = Instant::now() + poll_interval;
        let wake_at = player.next_deadline().map_or(poll_at, |due| due.min(poll_at));

        let event = tokio::select! {
            Some(()) = shutdown_rx.recv() => Event::Shutdown,
            Some(ev) = widget_events.recv() => Event::Widget(ev),
            maybe_intent = intents.recv() => match maybe_intent {
                Some(intent) => Event::Intent(intent),
                None => Event::Shutdown,
            },
            _ = tokio::time::sleep_until(wake_at) => {
                player.widget_mut().poll();
                continue;
            }
        };

        if !process_event(event, &mut player) {
            tracing::debug!("Event loop stopping");
            break;
        }
    }
    player
}
