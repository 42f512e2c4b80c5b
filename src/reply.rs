use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

/// One piece of a chat reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Segment {
    Text(String),
    ImageUrl(String),
    ImageBase64 {
        content_type: Option<String>,
        data: String,
    },
}

/// A user-visible message: progress notice, final result or error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub segments: Vec<Segment>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Text(text.into())],
        }
    }

    /// Concatenated text segments; images are skipped.
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Where commands push their replies. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReplySink {
    tx: mpsc::UnboundedSender<Reply>,
}

impl ReplySink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Reply>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, reply: Reply) {
        if self.tx.send(reply).is_err() {
            warn!("reply: receiver closed; dropping reply");
        }
    }

    pub fn text(&self, text: impl Into<String>) {
        self.send(Reply::text(text));
    }
}
