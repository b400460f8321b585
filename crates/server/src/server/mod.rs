//! Game server implementation.

use crate::config::Config;
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};
use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::pin::pin;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::{accept_async, tungstenite};
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

pub mod client;
pub mod game;

pub use game::{GameState, JoinError, SharedGame};

/// Connection tracking state (shared across connection handlers).
#[derive(Debug)]
pub struct ConnectionLimiter {
    /// Number of connections per IP address.
    ip_connections: HashMap<IpAddr, usize>,
    /// Total number of connections.
    total_connections: usize,
    max_total: usize,
    max_per_ip: usize,
}

impl ConnectionLimiter {
    pub fn new(max_total: usize, max_per_ip: usize) -> Self {
        Self {
            ip_connections: HashMap::new(),
            total_connections: 0,
            max_total,
            max_per_ip,
        }
    }

    /// Try to add a connection, returns true if allowed.
    pub fn try_add(&mut self, ip: IpAddr) -> bool {
        if self.total_connections >= self.max_total {
            return false;
        }

        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= self.max_per_ip {
            return false;
        }

        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    /// Remove a connection.
    pub fn remove(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }

    pub fn total(&self) -> usize {
        self.total_connections
    }
}

/// Transport-neutral view of an inbound WebSocket frame.
#[derive(Debug)]
pub enum Frame {
    Binary(Bytes),
    Close,
    /// Text, ping, pong and other frames the game does not use.
    Ignored,
    Error(String),
}

impl From<Result<Message, tungstenite::Error>> for Frame {
    fn from(msg: Result<Message, tungstenite::Error>) -> Self {
        match msg {
            Ok(Message::Binary(data)) => Frame::Binary(data),
            Ok(Message::Close(_)) => Frame::Close,
            Ok(_) => Frame::Ignored,
            Err(e) => Frame::Error(e.to_string()),
        }
    }
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("{} listening on ws://{}", config.server.name, addr);

    let limiter = Arc::new(RwLock::new(ConnectionLimiter::new(
        config.server.max_connections,
        config.server.ip_limit,
    )));
    let game = GameState::new(&config).shared();

    loop {
        let (stream, addr) = listener.accept().await?;
        let ip = addr.ip();

        if !limiter.write().await.try_add(ip) {
            warn!("Connection rejected (limit reached): {}", addr);
            continue;
        }

        let game = Arc::clone(&game);
        let limiter = Arc::clone(&limiter);

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, game).await;

            // Always remove from connection tracking when done
            limiter.write().await.remove(ip);

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, game: SharedGame) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (write, read) = ws_stream.split();
    let inbound = read.map(Frame::from);
    let outbound = write.with(|packet: Bytes| future::ready(Ok::<_, tungstenite::Error>(Message::Binary(packet))));

    drive_session(inbound, outbound, addr, game).await
}

/// Drive one session until either side closes.
///
/// Inbound packets are applied under the game lock; outbound packets come
/// from the broadcast channel in dispatch order. A failed send ends only this
/// session.
pub async fn drive_session<I, O>(inbound: I, outbound: O, addr: SocketAddr, game: SharedGame) -> anyhow::Result<()>
where
    I: Stream<Item = Frame>,
    O: Sink<Bytes>,
    O::Error: Display,
{
    let (session, mut rx) = game.lock().await.connect(addr);
    let mut inbound = pin!(inbound);
    let mut outbound = pin!(outbound);

    loop {
        tokio::select! {
            frame = inbound.next() => {
                match frame {
                    Some(Frame::Binary(data)) => {
                        let mut state = game.lock().await;
                        if let Err(e) = state.handle_packet(session, &data) {
                            warn!("Packet error from {}: {}", addr, e);
                        }
                    }
                    Some(Frame::Close) | None => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Frame::Error(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    Some(Frame::Ignored) => {}
                }
            }
            msg = rx.recv() => {
                match msg {
                    Ok(out) => {
                        if !out.is_for(session) {
                            continue;
                        }
                        if let Err(e) = outbound.send(out.packet).await {
                            warn!("Failed to send to {}: {}", addr, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Client {} lagged, {} packets dropped", addr, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    game.lock().await.disconnect(session);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_per_ip() {
        let mut limiter = ConnectionLimiter::new(10, 2);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(limiter.try_add(ip));
        assert!(limiter.try_add(ip));
        assert!(!limiter.try_add(ip));
        assert!(limiter.try_add("10.0.0.2".parse().unwrap()));
        limiter.remove(ip);
        assert!(limiter.try_add(ip));
        assert_eq!(limiter.total(), 3);
    }

    #[test]
    fn test_limiter_total() {
        let mut limiter = ConnectionLimiter::new(1, 5);
        assert!(limiter.try_add("10.0.0.1".parse().unwrap()));
        assert!(!limiter.try_add("10.0.0.2".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_session_joins_and_cleans_up() {
        use futures_util::{sink, stream};
        use protocol::packets::{ClientPacket, ServerPacket};
        use tokio::sync::mpsc;

        let game = GameState::with_seed(&Config::default(), 5).shared();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Frame>();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Bytes>();
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();

        let inbound = stream::unfold(in_rx, |mut rx| async move { rx.recv().await.map(|f| (f, rx)) });
        let outbound = sink::unfold(out_tx, |tx, packet: Bytes| async move {
            tx.send(packet).map_err(|_| "receiver closed")?;
            Ok::<_, &str>(tx)
        });
        let task = tokio::spawn(drive_session(inbound, outbound, addr, Arc::clone(&game)));

        let join = ClientPacket::Join { name: "alice".into() }.encode().finish();
        in_tx.send(Frame::Binary(join)).unwrap();

        let first = out_rx.recv().await.unwrap();
        assert!(matches!(ServerPacket::parse(&first).unwrap(), ServerPacket::Roster(r) if r.len() == 1));
        let second = out_rx.recv().await.unwrap();
        assert!(matches!(ServerPacket::parse(&second).unwrap(), ServerPacket::FoodUpdate(_)));
        assert_eq!(game.lock().await.registry.len(), 1);

        in_tx.send(Frame::Close).unwrap();
        task.await.unwrap().unwrap();
        let state = game.lock().await;
        assert!(state.registry.is_empty());
        assert!(state.clients.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delivery_ends_only_that_session() {
        use futures_util::{sink, stream};
        use protocol::packets::{ClientPacket, ServerPacket};
        use tokio::sync::mpsc;

        fn inbound(rx: mpsc::UnboundedReceiver<Frame>) -> impl Stream<Item = Frame> {
            stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|f| (f, rx)) })
        }

        fn roster_names(packet: &[u8]) -> Option<Vec<String>> {
            match ServerPacket::parse(packet).unwrap() {
                ServerPacket::Roster(entries) => Some(entries.into_iter().map(|e| e.name).collect()),
                _ => None,
            }
        }

        let game = GameState::with_seed(&Config::default(), 8).shared();

        // Healthy session joins first and sees its own roster and food.
        let (b_in, b_in_rx) = mpsc::unbounded_channel::<Frame>();
        let (b_out_tx, mut b_out) = mpsc::unbounded_channel::<Bytes>();
        let b_sink = sink::unfold(b_out_tx, |tx, packet: Bytes| async move {
            tx.send(packet).map_err(|_| "receiver closed")?;
            Ok::<_, &str>(tx)
        });
        let b_addr: SocketAddr = "127.0.0.1:4001".parse().unwrap();
        let b_task = tokio::spawn(drive_session(inbound(b_in_rx), b_sink, b_addr, Arc::clone(&game)));
        b_in.send(Frame::Binary(ClientPacket::Join { name: "bob".into() }.encode().finish())).unwrap();
        assert_eq!(roster_names(&b_out.recv().await.unwrap()), Some(vec!["bob".to_string()]));
        assert_eq!(roster_names(&b_out.recv().await.unwrap()), None);

        // Every write on this session fails.
        let (a_in, a_in_rx) = mpsc::unbounded_channel::<Frame>();
        let a_sink = sink::unfold((), |(), _packet: Bytes| async move { Err::<(), _>("connection reset") });
        let a_addr: SocketAddr = "127.0.0.1:4002".parse().unwrap();
        let a_task = tokio::spawn(drive_session(inbound(a_in_rx), a_sink, a_addr, Arc::clone(&game)));
        a_in.send(Frame::Binary(ClientPacket::Join { name: "alice".into() }.encode().finish())).unwrap();

        // The failing session tears itself down cleanly.
        a_task.await.unwrap().unwrap();

        // The healthy session still got the join, then the departure.
        assert_eq!(
            roster_names(&b_out.recv().await.unwrap()),
            Some(vec!["bob".to_string(), "alice".to_string()])
        );
        assert_eq!(roster_names(&b_out.recv().await.unwrap()), None);
        assert_eq!(roster_names(&b_out.recv().await.unwrap()), Some(vec!["bob".to_string()]));

        {
            let state = game.lock().await;
            assert_eq!(state.registry.len(), 1);
            assert_eq!(state.clients.len(), 1);
            assert_eq!(state.registry.list().next().map(|p| p.name.as_str()), Some("bob"));
        }

        b_in.send(Frame::Close).unwrap();
        b_task.await.unwrap().unwrap();
        assert!(game.lock().await.registry.is_empty());
    }
}
