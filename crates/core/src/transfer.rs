//! Stream copier
//!
//! Copies every byte of one [`Location`] into another. Sources and
//! destinations are opened through [`Copier::open_reader`] and
//! [`Copier::open_writer`], so a remote object, a local file and the process
//! standard streams are interchangeable on either side.
//!
//! The copy is fail-fast: the first error aborts the transfer. Once the
//! destination has been opened it is released exactly once, through
//! [`ObjectSink::commit`] on success or [`ObjectSink::abort`] on any failure,
//! timeout or interrupt, including one that hits the commit itself.
//!
//! The deadline applies only when one side is remote. Local files and the
//! standard streams may block as long as the other end does.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::path::Location;
use crate::traits::{ByteReader, ObjectSink, ObjectStore, SourceStream};

/// Default bound on a whole remote copy or listing
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default read buffer size
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Boxed byte sink used for local files and standard output
pub type ByteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Future that resolves when the user asks to stop
pub type Interrupt<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Tunables for a single transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Bound on an operation touching remote storage; `None` waits forever
    pub timeout: Option<Duration>,

    /// Size of the read buffer
    pub buffer_size: usize,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Receives progress notifications during a copy
pub trait TransferObserver: Send + Sync {
    /// The source has been opened; `total` is its size when known
    fn started(&self, _total: Option<u64>) {}

    /// `bytes` more bytes reached the destination
    fn advanced(&self, _bytes: u64) {}

    /// The destination was committed
    fn finished(&self) {}
}

/// Outcome of a successful copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub source: String,
    pub destination: String,
    pub bytes: u64,
}

/// Sink over a local file or standard output
pub struct WriterSink {
    writer: ByteWriter,
    label: String,
}

impl WriterSink {
    pub fn new(writer: ByteWriter, label: impl Into<String>) -> Self {
        Self {
            writer,
            label: label.into(),
        }
    }
}

#[async_trait::async_trait]
impl ObjectSink for WriterSink {
    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.writer
            .write_all(buf)
            .await
            .map_err(|e| Error::Transfer(format!("writing {}: {e}", self.label)))
    }

    async fn commit(&mut self) -> Result<()> {
        self.writer
            .flush()
            .await
            .map_err(|e| Error::Commit(format!("{}: {e}", self.label)))?;
        self.writer
            .shutdown()
            .await
            .map_err(|e| Error::Commit(format!("{}: {e}", self.label)))
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        debug!(destination = %self.label, "Releasing destination without commit");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now() + limit,
            limit,
        }
    }
}

/// Run `fut` until it finishes, the deadline passes, or the interrupt fires
async fn bounded<T>(
    fut: impl Future<Output = Result<T>>,
    deadline: Option<Deadline>,
    interrupt: &mut Option<Interrupt<'_>>,
) -> Result<T> {
    let timed = async {
        match deadline {
            Some(d) => tokio::time::timeout_at(d.at, fut)
                .await
                .map_err(|_| Error::Timeout(d.limit))?,
            None => fut.await,
        }
    };

    match interrupt {
        Some(signal) => tokio::select! {
            result = timed => result,
            _ = signal.as_mut() => Err(Error::Interrupted),
        },
        None => timed.await,
    }
}

/// Abort `sink`, logging rather than returning a failure to release
async fn release(sink: Box<dyn ObjectSink>, destination: &Location) {
    if let Err(err) = sink.abort().await {
        warn!(%destination, "Failed to release destination: {err}");
    }
}

/// Copy loop: read until end of stream, forwarding every chunk in order
async fn pump(
    reader: &mut ByteReader,
    sink: &mut dyn ObjectSink,
    buffer_size: usize,
    observer: Option<&dyn TransferObserver>,
) -> Result<u64> {
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| Error::Transfer(format!("reading source: {e}")))?;
        if n == 0 {
            break;
        }

        sink.write(&buf[..n]).await?;
        total += n as u64;

        if let Some(observer) = observer {
            observer.advanced(n as u64);
        }
    }

    Ok(total)
}

/// Copies bytes between locations
pub struct Copier<'a> {
    store: Option<&'a dyn ObjectStore>,
    stdin: Option<ByteReader>,
    stdout: Option<ByteWriter>,
    options: TransferOptions,
    observer: Option<&'a dyn TransferObserver>,
    interrupt: Option<Interrupt<'a>>,
}

impl<'a> Copier<'a> {
    /// Create a copier that only handles local and stdio locations
    pub fn new(options: TransferOptions) -> Self {
        Self {
            store: None,
            stdin: None,
            stdout: None,
            options,
            observer: None,
            interrupt: None,
        }
    }

    /// Use `store` for `gs://` locations
    pub fn with_store(mut self, store: &'a dyn ObjectStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the process standard streams
    pub fn with_stdio(mut self, input: ByteReader, output: ByteWriter) -> Self {
        self.stdin = Some(input);
        self.stdout = Some(output);
        self
    }

    /// Report progress to `observer`
    pub fn with_observer(mut self, observer: &'a dyn TransferObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Stop the transfer with [`Error::Interrupted`] once `signal` resolves
    pub fn interrupt_on(mut self, signal: impl Future<Output = ()> + Send + 'a) -> Self {
        self.interrupt = Some(Box::pin(signal));
        self
    }

    fn store(&self) -> Result<&'a dyn ObjectStore> {
        self.store.ok_or_else(|| {
            Error::General("No storage client configured for remote locations".into())
        })
    }

    /// Open `location` for reading
    pub async fn open_reader(&mut self, location: &Location) -> Result<SourceStream> {
        match location {
            Location::Remote(path) => self.store()?.open_read(path).await,
            Location::Stdio => {
                let input = self
                    .stdin
                    .take()
                    .unwrap_or_else(|| Box::new(tokio::io::stdin()));
                Ok(SourceStream::new(input, None))
            }
            Location::Local(path) => {
                let file = File::open(path)
                    .await
                    .map_err(|e| Error::from_open(e, &path.display().to_string()))?;
                let metadata = file.metadata().await?;
                if metadata.is_dir() {
                    return Err(Error::InvalidPath(format!(
                        "{} is a directory",
                        path.display()
                    )));
                }
                Ok(SourceStream::new(Box::new(file), Some(metadata.len())))
            }
        }
    }

    /// Open `location` for writing, creating or truncating local files
    pub async fn open_writer(&mut self, location: &Location) -> Result<Box<dyn ObjectSink>> {
        match location {
            Location::Remote(path) => self.store()?.open_write(path).await,
            Location::Stdio => {
                let output = self
                    .stdout
                    .take()
                    .unwrap_or_else(|| Box::new(tokio::io::stdout()));
                Ok(Box::new(WriterSink::new(output, "standard output")))
            }
            Location::Local(path) => {
                let label = path.display().to_string();
                let file = File::create(path)
                    .await
                    .map_err(|e| Error::from_open(e, &label))?;
                Ok(Box::new(WriterSink::new(Box::new(file), label)))
            }
        }
    }

    /// Copy every byte of `source` into `destination`
    pub async fn copy(
        mut self,
        source: &Location,
        destination: &Location,
    ) -> Result<TransferSummary> {
        let deadline = if source.is_remote() || destination.is_remote() {
            self.options.timeout.map(Deadline::after)
        } else {
            None
        };
        let mut interrupt = self.interrupt.take();

        debug!(%source, %destination, "Opening transfer endpoints");
        let (mut input, mut sink) = bounded(
            async {
                let input = self.open_reader(source).await?;
                let sink = self.open_writer(destination).await?;
                Ok((input, sink))
            },
            deadline,
            &mut interrupt,
        )
        .await?;

        if let Some(observer) = self.observer {
            observer.started(input.size);
        }

        let pumped = bounded(
            pump(
                &mut input.reader,
                sink.as_mut(),
                self.options.buffer_size,
                self.observer,
            ),
            deadline,
            &mut interrupt,
        )
        .await;

        let bytes = match pumped {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%destination, "Transfer failed, releasing destination: {err}");
                release(sink, destination).await;
                return Err(err);
            }
        };

        drop(input);
        let committed = bounded(sink.commit(), deadline, &mut interrupt).await;
        if let Err(err) = committed {
            warn!(%destination, "Commit failed, releasing destination: {err}");
            release(sink, destination).await;
            return Err(err);
        }
        debug!(%source, %destination, bytes, "Transfer committed");

        if let Some(observer) = self.observer {
            observer.finished();
        }

        Ok(TransferSummary {
            source: source.to_string(),
            destination: destination.to_string(),
            bytes,
        })
    }
}
