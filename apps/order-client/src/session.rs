//! Operator loop: pick an interaction mode, type order names, see responses.

use std::str::FromStr;
use std::sync::Arc;

use futures::StreamExt;
use order_management_sdk::{OrderIdSequence, OrderManagementClientV1, OrderResponse};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::ReceiverStream;

/// Typed by the operator to leave the loop or finish a batch of names.
const EXIT: &str = "exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Unary,
    ServerStream,
    ClientStream,
    BidiStream,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unary" => Ok(Self::Unary),
            "server_stream" => Ok(Self::ServerStream),
            "client_stream" => Ok(Self::ClientStream),
            "bidi_stream" => Ok(Self::BidiStream),
            other => Err(format!("unknown rpc mode '{other}'")),
        }
    }
}

/// Console output shared with the bidirectional receive task.
pub struct Console<W> {
    out: Arc<Mutex<W>>,
}

impl<W> Clone for Console<W> {
    fn clone(&self) -> Self {
        Self {
            out: Arc::clone(&self.out),
        }
    }
}

impl<W: AsyncWrite + Unpin> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    async fn write(&self, text: &str) -> std::io::Result<()> {
        let mut out = self.out.lock().await;
        out.write_all(text.as_bytes()).await?;
        out.flush().await
    }

    async fn line(&self, text: &str) -> std::io::Result<()> {
        self.write(&format!("{text}\n")).await
    }

    async fn received(&self, response: &OrderResponse) -> std::io::Result<()> {
        self.line(&format!(
            "Received: {}, {}, {}",
            response.order_id, response.order_name, response.timestamp
        ))
        .await
    }
}

/// One operator session: its own order id sequence, input and console.
pub struct OperatorSession<C, R, W> {
    client: C,
    input: Lines<R>,
    console: Console<W>,
    ids: OrderIdSequence,
}

impl<C, R, W> OperatorSession<C, R, W>
where
    C: OrderManagementClientV1,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(client: C, input: R, output: W) -> Self {
        Self {
            client,
            input: input.lines(),
            console: Console::new(output),
            ids: OrderIdSequence::default(),
        }
    }

    /// Prompt for modes until the operator types `exit` or input ends.
    ///
    /// RPC failures are reported on the console and the loop continues.
    ///
    /// # Errors
    /// Returns an error only when the console itself fails.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            self.console.write("\nEnter rpc mode: ").await?;
            let Some(line) = self.input.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line == EXIT {
                break;
            }

            match line.parse::<Mode>() {
                Ok(mode) => self.run_mode(mode).await?,
                Err(e) => {
                    tracing::debug!(error = %e, "invalid mode");
                    self.console.line("Invalid rpc mode").await?;
                }
            }
        }
        Ok(())
    }

    async fn run_mode(&mut self, mode: Mode) -> anyhow::Result<()> {
        match mode {
            Mode::Unary => self.unary().await,
            Mode::ServerStream => self.server_stream().await,
            Mode::ClientStream => self.client_stream().await,
            Mode::BidiStream => self.bidi_stream().await,
        }
    }

    async fn read_name(&mut self) -> anyhow::Result<Option<String>> {
        Ok(self
            .input
            .next_line()
            .await?
            .map(|line| line.trim().to_owned()))
    }

    async fn prompt_name(&mut self) -> anyhow::Result<Option<String>> {
        self.console.write("Enter order name: ").await?;
        self.read_name().await
    }

    async fn unary(&mut self) -> anyhow::Result<()> {
        self.console.line("RPC mode is set to unary").await?;
        let Some(name) = self.prompt_name().await? else {
            return Ok(());
        };

        match self.client.unary_get_order(self.ids.next_request(name)).await {
            Ok(response) => self.console.received(&response).await?,
            Err(e) => {
                self.console
                    .line(&format!("Failed to call UnaryGetOrder: {e}"))
                    .await?;
            }
        }
        Ok(())
    }

    async fn server_stream(&mut self) -> anyhow::Result<()> {
        self.console.line("RPC mode is set to server streaming").await?;
        let Some(name) = self.prompt_name().await? else {
            return Ok(());
        };

        let mut responses = match self
            .client
            .server_stream_get_order(self.ids.next_request(name))
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                self.console
                    .line(&format!("Failed to call ServerStreamGetOrder: {e}"))
                    .await?;
                return Ok(());
            }
        };

        while let Some(item) = responses.next().await {
            match item {
                Ok(response) => self.console.received(&response).await?,
                Err(e) => {
                    self.console
                        .line(&format!("Failed to receive order: {e}"))
                        .await?;
                    break;
                }
            }
        }
        Ok(())
    }

    async fn client_stream(&mut self) -> anyhow::Result<()> {
        self.console.line("RPC mode is set to client streaming").await?;

        let mut batch = Vec::new();
        while let Some(name) = self.prompt_name().await? {
            if name == EXIT {
                break;
            }
            batch.push(self.ids.next_request(name));
        }

        let requests = futures::stream::iter(batch).boxed();
        match self.client.client_stream_get_order(requests).await {
            Ok(response) => self.console.received(&response).await?,
            Err(e) => {
                self.console
                    .line(&format!("Failed to receive order: {e}"))
                    .await?;
            }
        }
        Ok(())
    }

    async fn bidi_stream(&mut self) -> anyhow::Result<()> {
        self.console
            .line("RPC mode is set to bi-directional streaming")
            .await?;

        let (tx, rx) = mpsc::channel(16);
        let mut responses = match self
            .client
            .bidi_stream_get_order(ReceiverStream::new(rx).boxed())
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                self.console
                    .line(&format!("Failed to call BiDiStreamGetOrder: {e}"))
                    .await?;
                return Ok(());
            }
        };

        let console = self.console.clone();
        let printer = tokio::spawn(async move {
            while let Some(item) = responses.next().await {
                let written = match item {
                    Ok(response) => console.received(&response).await,
                    Err(e) => {
                        let _ = console.line(&format!("Failed to receive order: {e}")).await;
                        break;
                    }
                };
                if written.is_err() {
                    break;
                }
            }
        });

        while let Some(name) = self.read_name().await? {
            if name == EXIT {
                break;
            }
            if tx.send(self.ids.next_request(name)).await.is_err() {
                self.console.line("Failed to send order: call ended").await?;
                break;
            }
        }

        // Half-close, then let the remaining responses print before the next prompt.
        drop(tx);
        if let Err(e) = printer.await {
            tracing::warn!(error = %e, "response printer task failed");
        }
        Ok(())
    }
}
