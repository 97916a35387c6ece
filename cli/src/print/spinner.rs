//! Progress indicator for blocking waits.

use super::{Output, Printer};
use crossterm::{
    cursor, queue,
    terminal::{Clear, ClearType},
};
use std::io::Write;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
const TICK: Duration = Duration::from_millis(100);

/// Rotating glyph with elapsed time on the last stderr line.
///
/// Inert when progress is disabled, so callers never need to check.
pub struct Spinner {
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Spinner {
    pub fn start(printer: &Printer, message: impl Into<String>) -> Self {
        if !printer.progress_enabled() {
            return Self { running: None };
        }
        let message = message.into();
        let stop = CancellationToken::new();
        let handle = tokio::spawn(spin(printer.err_stream(), message, stop.clone()));
        Self {
            running: Some((stop, handle)),
        }
    }

    /// Stop and clear the line before anything else is printed.
    pub async fn stop(mut self) {
        if let Some((stop, handle)) = self.running.take() {
            stop.cancel();
            let _ = handle.await;
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some((stop, _)) = self.running.take() {
            stop.cancel();
        }
    }
}

async fn spin(stream: Output, message: String, stop: CancellationToken) {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(TICK);
    let mut frame = 0usize;

    {
        let mut err = stream.lock().unwrap_or_else(|p| p.into_inner());
        let _ = queue!(err, cursor::Hide);
        let _ = err.flush();
    }

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let mut err = stream.lock().unwrap_or_else(|p| p.into_inner());
                let glyph = FRAMES[frame % FRAMES.len()];
                let _ = write!(
                    err,
                    "\r{} {} ({}s)",
                    glyph,
                    message,
                    started.elapsed().as_secs()
                );
                let _ = err.flush();
                frame += 1;
            }
        }
    }

    let mut err = stream.lock().unwrap_or_else(|p| p.into_inner());
    let _ = queue!(err, Clear(ClearType::CurrentLine), cursor::MoveToColumn(0), cursor::Show);
    let _ = err.flush();
}
