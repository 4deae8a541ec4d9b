//! Ordered playback of assistant audio.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::VoxloopError;

/// Destination for decoded audio chunks.
#[async_trait]
pub trait AudioSink: Send + Sync + 'static {
    /// Play one chunk. The future may be dropped mid-chunk on interruption.
    async fn play(&self, chunk: &[u8]) -> Result<(), VoxloopError>;
}

/// Discards audio.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl AudioSink for NullSink {
    async fn play(&self, _chunk: &[u8]) -> Result<(), VoxloopError> {
        Ok(())
    }
}

/// Appends raw audio bytes to an async writer (a file, a pipe to a player).
pub struct WriterSink<W> {
    writer: tokio::sync::Mutex<W>,
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
        }
    }
}

#[async_trait]
impl<W> AudioSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn play(&self, chunk: &[u8]) -> Result<(), VoxloopError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(chunk).await?;
        writer.flush().await?;
        Ok(())
    }
}

enum QueueItem {
    Chunk { generation: u64, bytes: Vec<u8> },
    EndOfResponse { generation: u64 },
}

/// Generation and interrupt token change together under one lock so a chunk
/// can never be matched against a stale token.
struct Epoch {
    generation: u64,
    interrupt: CancellationToken,
}

struct Shared {
    epoch: Mutex<Epoch>,
    active: AtomicBool,
}

impl Shared {
    fn epoch(&self) -> MutexGuard<'_, Epoch> {
        self.epoch.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Token for a chunk of `generation`, or `None` when it was flushed.
    fn admit(&self, generation: u64) -> Option<CancellationToken> {
        let epoch = self.epoch();
        if epoch.generation != generation {
            return None;
        }
        self.active.store(true, Ordering::SeqCst);
        Some(epoch.interrupt.clone())
    }
}

/// Plays chunks strictly in enqueue order on a dedicated task.
///
/// `Idle -> Playing` on the first enqueued chunk; back to `Idle` on
/// [`stop`](Self::stop) (immediate, discards everything unplayed) or once the
/// queue drains past a [`finish`](Self::finish) marker.
pub struct PlaybackController {
    tx: Option<mpsc::UnboundedSender<QueueItem>>,
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackController {
    /// Spawn the playback task. Requires a tokio runtime.
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        let shared = Arc::new(Shared {
            epoch: Mutex::new(Epoch {
                generation: 0,
                interrupt: CancellationToken::new(),
            }),
            active: AtomicBool::new(false),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_playback(rx, sink, Arc::clone(&shared)));
        Self {
            tx: Some(tx),
            shared,
            task: Some(task),
        }
    }

    /// Whether audio is queued or playing.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Queue one chunk behind everything already queued. Never blocks.
    pub fn enqueue_chunk(&self, bytes: Vec<u8>) -> Result<(), VoxloopError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let generation = {
            let epoch = self.shared.epoch();
            self.shared.active.store(true, Ordering::SeqCst);
            epoch.generation
        };
        self.send(QueueItem::Chunk { generation, bytes })
    }

    /// Let queued audio play out, then return to `Idle`.
    pub fn finish(&self) -> Result<(), VoxloopError> {
        let generation = self.shared.epoch().generation;
        self.send(QueueItem::EndOfResponse { generation })
    }

    /// Discard all unplayed audio, interrupt the current chunk, go `Idle` now.
    pub fn stop(&self) {
        let mut epoch = self.shared.epoch();
        epoch.generation = epoch.generation.wrapping_add(1);
        epoch.interrupt.cancel();
        epoch.interrupt = CancellationToken::new();
        self.shared.active.store(false, Ordering::SeqCst);
    }

    /// Stop and wait for the playback task to exit.
    pub async fn shutdown(&mut self) {
        self.stop();
        self.tx.take();
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!(%error, "playback task ended abnormally");
            }
        }
    }

    fn send(&self, item: QueueItem) -> Result<(), VoxloopError> {
        self.tx
            .as_ref()
            .ok_or_else(|| VoxloopError::Audio("playback controller is shut down".into()))?
            .send(item)
            .map_err(|_| VoxloopError::Audio("playback task is not running".into()))
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackController")
            .field("active", &self.is_active())
            .field("running", &self.tx.is_some())
            .finish()
    }
}

async fn run_playback(
    mut rx: mpsc::UnboundedReceiver<QueueItem>,
    sink: Arc<dyn AudioSink>,
    shared: Arc<Shared>,
) {
    while let Some(item) = rx.recv().await {
        match item {
            QueueItem::Chunk { generation, bytes } => {
                let Some(interrupt) = shared.admit(generation) else {
                    continue;
                };
                tokio::select! {
                    biased;
                    _ = interrupt.cancelled() => {
                        tracing::debug!(bytes = bytes.len(), "playback interrupted mid-chunk");
                    }
                    result = sink.play(&bytes) => {
                        if let Err(error) = result {
                            tracing::warn!(%error, "audio sink failed to play chunk");
                        }
                    }
                }
            }
            QueueItem::EndOfResponse { generation } => {
                let epoch = shared.epoch();
                if epoch.generation == generation {
                    shared.active.store(false, Ordering::SeqCst);
                    tracing::debug!("playback drained");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Records every chunk it starts; chunks starting with `0xFF` never finish.
    struct GatedSink {
        started: mpsc::UnboundedSender<Vec<u8>>,
    }

    #[async_trait]
    impl AudioSink for GatedSink {
        async fn play(&self, chunk: &[u8]) -> Result<(), VoxloopError> {
            let _ = self.started.send(chunk.to_vec());
            if chunk.first() == Some(&0xFF) {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    fn gated_sink() -> (PlaybackController, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (started, rx) = mpsc::unbounded_channel();
        (PlaybackController::new(Arc::new(GatedSink { started })), rx)
    }

    async fn next_started(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> Vec<u8> {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("chunk should start")
            .expect("sink channel open")
    }

    #[tokio::test]
    async fn plays_in_enqueue_order() {
        let (playback, mut started) = gated_sink();
        for chunk in [vec![1u8], vec![2], vec![3]] {
            playback.enqueue_chunk(chunk).unwrap();
        }
        assert!(playback.is_active());
        assert_eq!(next_started(&mut started).await, vec![1]);
        assert_eq!(next_started(&mut started).await, vec![2]);
        assert_eq!(next_started(&mut started).await, vec![3]);
    }

    #[tokio::test]
    async fn stop_discards_unplayed_chunks() {
        let (playback, mut started) = gated_sink();
        playback.enqueue_chunk(vec![0xFF, 1]).unwrap();
        playback.enqueue_chunk(vec![2]).unwrap();
        playback.enqueue_chunk(vec![3]).unwrap();
        assert_eq!(next_started(&mut started).await, vec![0xFF, 1]);

        playback.stop();
        assert!(!playback.is_active());

        playback.enqueue_chunk(vec![4]).unwrap();
        assert_eq!(next_started(&mut started).await, vec![4]);
        assert!(started.try_recv().is_err());
    }

    #[tokio::test]
    async fn finish_drains_then_goes_idle() {
        let (mut playback, mut started) = gated_sink();
        playback.enqueue_chunk(vec![1]).unwrap();
        playback.enqueue_chunk(vec![2]).unwrap();
        playback.finish().unwrap();
        assert_eq!(next_started(&mut started).await, vec![1]);
        assert_eq!(next_started(&mut started).await, vec![2]);

        tokio::time::timeout(Duration::from_secs(1), async {
            while playback.is_active() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("playback should go idle after draining");

        playback.shutdown().await;
        assert!(playback.enqueue_chunk(vec![9]).is_err());
    }

    #[tokio::test]
    async fn stale_finish_marker_does_not_idle_new_audio() {
        let (playback, mut started) = gated_sink();
        playback.enqueue_chunk(vec![0xFF]).unwrap();
        playback.finish().unwrap();
        assert_eq!(next_started(&mut started).await, vec![0xFF]);

        playback.stop();
        playback.enqueue_chunk(vec![0xFF, 2]).unwrap();
        assert_eq!(next_started(&mut started).await, vec![0xFF, 2]);
        assert!(playback.is_active());
    }

    #[tokio::test]
    async fn empty_chunks_are_ignored() {
        let (playback, _started) = gated_sink();
        playback.enqueue_chunk(Vec::new()).unwrap();
        assert!(!playback.is_active());
    }

    #[tokio::test]
    async fn writer_sink_appends_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.pcm");
        let file = tokio::fs::File::create(&path).await.unwrap();
        let sink = WriterSink::new(file);
        sink.play(&[1, 2]).await.unwrap();
        sink.play(&[3]).await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), vec![1, 2, 3]);
    }
}
