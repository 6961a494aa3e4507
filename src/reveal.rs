use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

const PAUSE_CHARS: [char; 4] = ['.', '!', '?', ':'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealPacing {
    pub char_delay: Duration,
    pub pause_delay: Duration,
}

impl Default for RevealPacing {
    fn default() -> Self {
        Self {
            char_delay: Duration::from_millis(20),
            pause_delay: Duration::from_millis(150),
        }
    }
}

impl RevealPacing {
    pub fn delay_after(&self, ch: char) -> Duration {
        if PAUSE_CHARS.contains(&ch) {
            self.pause_delay
        } else {
            self.char_delay
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealFrame {
    pub text: String,
    pub done: bool,
}

/// Typewriter effect running as its own task. The renderer reads the latest
/// frame; `skip` ends the effect early and the full text is still delivered.
pub struct Reveal {
    token: CancellationToken,
    task: JoinHandle<()>,
    frames: watch::Receiver<RevealFrame>,
}

impl Reveal {
    pub fn start(text: String, pacing: RevealPacing) -> Self {
        let token = CancellationToken::new();
        let (frame_tx, frames) = watch::channel(RevealFrame::default());
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            for ch in text.chars() {
                frame_tx.send_modify(|frame| frame.text.push(ch));
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = tokio::time::sleep(pacing.delay_after(ch)) => {}
                }
            }
            frame_tx.send_replace(RevealFrame { text, done: true });
        });

        Self {
            token,
            task,
            frames,
        }
    }

    pub fn skip(&self) {
        self.token.cancel();
    }

    pub fn frame(&self) -> RevealFrame {
        self.frames.borrow().clone()
    }

    pub fn is_done(&self) -> bool {
        self.frames.borrow().done
    }

    pub async fn finished(mut self) -> RevealFrame {
        if let Err(e) = (&mut self.task).await {
            log::error!("Reveal task failed: {e}");
        }
        self.frame()
    }
}

impl Drop for Reveal {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
