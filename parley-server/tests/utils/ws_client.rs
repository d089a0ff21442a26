use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use parley_core::{RoomId, SignalMessage, UserId};
use parley_server::{RelayConfig, SignalingGateway, serve_with_listener};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::signal_helpers::signal_timeout;

/// A relay running on an ephemeral port; stops when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub gateway: SignalingGateway,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    pub async fn start(config: RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let gateway = SignalingGateway::new(config);
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(serve_with_listener(listener, gateway.clone(), async move {
            let _ = rx.await;
        }));

        Ok(Self {
            addr,
            gateway,
            _shutdown: tx,
        })
    }

    pub fn ws_url(&self, query: &str) -> String {
        format!("ws://{}/ws?{}", self.addr, query)
    }

    /// Plain HTTP GET, returning the raw response text.
    pub async fn http_get(&self, path: &str) -> Result<String> {
        let mut stream = TcpStream::connect(self.addr).await?;
        let request = format!("GET {path} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", self.addr);
        stream.write_all(request.as_bytes()).await?;

        let mut response = String::new();
        tokio::time::timeout(signal_timeout(), stream.read_to_string(&mut response))
            .await
            .context("timed out reading response")??;
        Ok(response)
    }
}

pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(server: &TestServer, user_id: &str, room_id: &str) -> Result<Self> {
        let url = server.ws_url(&format!("userId={user_id}&roomId={room_id}"));
        let (stream, _) = connect_async(url.as_str())
            .await
            .context("WebSocket connect failed")?;

        // The relay registers the member after the upgrade completes
        let (room_id, user_id) = (RoomId::from(room_id), UserId::from(user_id));
        tokio::time::timeout(signal_timeout(), async {
            while server.gateway.directory().lookup(&room_id, &user_id).is_err() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .context("member never registered")?;

        Ok(Self { stream })
    }

    pub async fn send(&mut self, msg: &SignalMessage) -> Result<()> {
        self.stream.send(Message::Text(msg.encode()?.into())).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<SignalMessage> {
        loop {
            let frame = tokio::time::timeout(signal_timeout(), self.stream.next())
                .await
                .context("timed out waiting for frame")?;
            match frame {
                Some(Ok(Message::Text(text))) => return Ok(SignalMessage::decode(text.as_str())?),
                Some(Ok(Message::Close(_))) | None => bail!("connection closed"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Keeps reading for `period`, answering pings as they come in. Returns
    /// the signals received and the number of pings. Fails if the server
    /// closes the socket.
    pub async fn read_for(&mut self, period: Duration) -> Result<(Vec<SignalMessage>, usize)> {
        let deadline = tokio::time::Instant::now() + period;
        let mut signals = Vec::new();
        let mut pings = 0;
        loop {
            let frame = match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Ok(frame) => frame,
                Err(_) => return Ok((signals, pings)),
            };
            match frame {
                Some(Ok(Message::Text(text))) => signals.push(SignalMessage::decode(text.as_str())?),
                Some(Ok(Message::Ping(_))) => pings += 1,
                Some(Ok(Message::Close(_))) | None => bail!("connection closed"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Waits until the server closes the socket.
    pub async fn wait_closed(&mut self) -> Result<()> {
        loop {
            let frame = tokio::time::timeout(signal_timeout(), self.stream.next())
                .await
                .context("timed out waiting for close")?;
            match frame {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return Ok(()),
                Some(Ok(_)) => continue,
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
