use abn::{
    CheckReady, CommitCard, DealHand, DealtCards, Okay, ReadyCheck, Reply, Request, ResolveRound,
    RoundResolution,
};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::{open_reply, MatchService, ServiceError};

/// Talks to the match service in JSON lines: one [`Request`] per line out,
/// one [`Reply`] per line back.
///
/// A background task owns both ends of the connection and always reads the
/// reply to every request it wrote. A caller that stops waiting for its reply
/// therefore never leaves it behind for the next request.
pub struct LineService {
    exchanges: mpsc::UnboundedSender<Exchange>,
}

struct Exchange {
    line: String,
    reply: oneshot::Sender<Result<String, ServiceError>>,
}

impl LineService {
    /// Spawns the connection task, so this needs a tokio runtime.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (exchanges, queue) = mpsc::unbounded_channel();
        tokio::spawn(serve_connection(reader, writer, queue));
        Self { exchanges }
    }

    /// A [`LineService`] over the process' own stdin and stdout.
    ///
    /// This is how player processes started by the referee reach it.
    /// Stderr stays free for logging.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }

    async fn perform_request<T: DeserializeOwned>(
        &self,
        req: Request,
        on_empty: Option<T>,
    ) -> Result<T, ServiceError> {
        let mut line = serde_json::to_string(&req)?;
        trace!(request = %line, "Sending request");
        line.push('\n');

        let (reply, reply_rx) = oneshot::channel();
        self.exchanges
            .send(Exchange { line, reply })
            .map_err(|_| ServiceError::Disconnected)?;
        let serialized_reply = reply_rx.await.map_err(|_| ServiceError::Disconnected)??;
        trace!(reply = %serialized_reply, "Received reply");
        let reply = serde_json::from_str::<Reply<T>>(&serialized_reply)?;
        open_reply(reply, on_empty)
    }
}

/// Writes each queued request and reads its reply, strictly one after the other.
async fn serve_connection<R, W>(
    mut reader: R,
    mut writer: W,
    mut queue: mpsc::UnboundedReceiver<Exchange>,
) where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // A re-usable buffer for IO.
    let mut buf = String::new();
    while let Some(exchange) = queue.recv().await {
        let result = exchange_line(&mut reader, &mut writer, &exchange.line, &mut buf).await;
        if exchange.reply.send(result).is_err() {
            debug!("Dropped the reply to a request nobody waits for anymore");
        }
    }
}

async fn exchange_line<R, W>(
    reader: &mut R,
    writer: &mut W,
    line: &str,
    buf: &mut String,
) -> Result<String, ServiceError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    buf.clear();
    let num_bytes_read = reader.read_line(buf).await?;
    if num_bytes_read == 0 {
        return Err(ServiceError::Disconnected);
    }
    Ok(String::from(buf.trim_end()))
}

impl MatchService for LineService {
    async fn deal_hand(&self, req: &DealHand) -> Result<DealtCards, ServiceError> {
        self.perform_request(Request::DealHand(req.clone()), None)
            .await
    }

    async fn commit_card(&self, req: &CommitCard) -> Result<Okay, ServiceError> {
        self.perform_request(Request::CommitCard(req.clone()), Some(Okay()))
            .await
    }

    async fn check_ready(&self, req: &CheckReady) -> Result<ReadyCheck, ServiceError> {
        self.perform_request(Request::CheckReady(req.clone()), None)
            .await
    }

    async fn resolve_round(&self, req: &ResolveRound) -> Result<RoundResolution, ServiceError> {
        self.perform_request(Request::ResolveRound(req.clone()), None)
            .await
    }
}
