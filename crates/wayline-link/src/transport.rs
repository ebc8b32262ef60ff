use mavlink::{common::MavMessage, MavConnection, MavHeader, Message};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wayline_proto::{TelemetryEvent, TelemetrySink};

use crate::{LinkConfig, LinkError};

/// Encoded message pipe to one vehicle.
///
/// Not shareable between concurrent exchanges: every method takes `&mut self`.
pub trait Transport {
    fn send(&mut self, msg: &MavMessage) -> impl Future<Output = Result<(), LinkError>>;

    /// Next decoded frame, or `Ok(None)` once `timeout` passes without one.
    fn recv(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<(MavHeader, MavMessage)>, LinkError>>;
}

type Connection = Arc<dyn MavConnection<MavMessage> + Send + Sync>;

/// Transport over a `mavlink` connection (tcp, udp or serial).
pub struct MavTransport {
    conn: Connection,
    hdr: MavHeader,
    rx: mpsc::Receiver<(MavHeader, MavMessage)>,
}

impl MavTransport {
    /// Connect and start the reader. Must be called inside a tokio runtime.
    ///
    /// Every decoded frame is offered to `sink` before the link sees it.
    pub fn open(cfg: &LinkConfig, sink: Option<Arc<dyn TelemetrySink>>) -> Result<Self, LinkError> {
        let conn = mavlink::connect::<MavMessage>(&cfg.url)
            .map_err(|e| LinkError::Transport(format!("mavlink connect {}: {}", cfg.url, e)))?;
        let conn: Connection = Arc::from(conn);
        info!("link: connected {}", cfg.url);

        let (tx, rx) = mpsc::channel(cfg.channel_capacity());
        let reader = conn.clone();

        // mavlink recv blocks
        tokio::task::spawn_blocking(move || read_frames(reader, tx, sink));

        Ok(Self {
            conn,
            hdr: MavHeader { system_id: cfg.sys_id, component_id: cfg.comp_id, sequence: 0 },
            rx,
        })
    }
}

/// Forward decoded frames until the receiving `MavTransport` is dropped.
fn read_frames(
    conn: Connection,
    tx: mpsc::Sender<(MavHeader, MavMessage)>,
    sink: Option<Arc<dyn TelemetrySink>>,
) {
    loop {
        match conn.recv() {
            Ok((hdr, msg)) => {
                if let Some(sink) = &sink {
                    sink.publish(TelemetryEvent::now(
                        msg.message_name(),
                        hdr.system_id,
                        hdr.component_id,
                        format!("{:?}", msg),
                    ));
                }
                if tx.blocking_send((hdr, msg)).is_err() {
                    debug!("link: reader stopped, receiver dropped");
                    return;
                }
            }
            Err(e) => {
                // a dead port fails every read, so this is the only exit once the link is gone
                if tx.is_closed() {
                    debug!("link: reader stopped after recv error: {}", e);
                    return;
                }
                debug!("link: recv error: {}", e);
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

impl Transport for MavTransport {
    async fn send(&mut self, msg: &MavMessage) -> Result<(), LinkError> {
        self.hdr.sequence = self.hdr.sequence.wrapping_add(1);
        self.conn
            .send(&self.hdr, msg)
            .map_err(|e| LinkError::Transport(format!("mavlink send: {}", e)))?;
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Option<(MavHeader, MavMessage)>, LinkError> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => {
                warn!("link: reader task ended");
                Err(LinkError::Transport("reader task ended".into()))
            }
            Err(_elapsed) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn reader_exits_on_dead_peer_once_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let peer = std::thread::spawn(move || drop(listener.accept()));
        let conn = mavlink::connect::<MavMessage>(&format!("tcpout:127.0.0.1:{}", port)).unwrap();
        let conn: Connection = Arc::from(conn);
        peer.join().unwrap();

        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            read_frames(conn, tx, None);
            let _ = done_tx.send(());
        });
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}
