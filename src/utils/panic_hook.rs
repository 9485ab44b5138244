use crate::domain::model::Payload;
use std::any::Any;
use std::panic::{self, Location};

/// Replaces the default stderr panic printer with a tracing event.
///
/// Contained panics are expected in this program, so they go through the same
/// pipeline as every other log line. Call once, after the logger is initialized.
pub fn install() {
    panic::set_hook(Box::new(|info| {
        let (payload, location) = describe(info.payload(), info.location());
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("<unnamed>");

        tracing::error!(
            thread = thread_name,
            location = %location,
            "💥 panic: {}",
            payload
        );
    }));
}

/// Payload and `file:line` of a panic, as logged by the hook.
fn describe(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> (Payload, String) {
    let location = location
        .map(|l| format!("{}:{}", l.file(), l.line()))
        .unwrap_or_else(|| "unknown".to_string());
    (Payload::from_any(payload), location)
}
