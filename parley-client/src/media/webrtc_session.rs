use crate::media::{MediaError, MediaEvents, MediaSession, MediaSessionFactory};
use async_trait::async_trait;
use parley_core::{Candidate, SessionDescription, UserId};
use std::sync::Arc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Builds data-channel-only sessions on the `webrtc` crate. Applications that
/// want audio or video add tracks to the peer connection themselves.
#[derive(Debug, Clone, Default)]
pub struct WebRtcSessionFactory {
    ice_servers: Vec<String>,
}

impl WebRtcSessionFactory {
    pub fn new(ice_servers: Vec<String>) -> Self {
        Self { ice_servers }
    }
}

impl MediaSessionFactory for WebRtcSessionFactory {
    fn create(
        &self,
        remote: &UserId,
        events: MediaEvents,
    ) -> Result<Box<dyn MediaSession>, MediaError> {
        Ok(Box::new(WebRtcSession {
            remote: remote.clone(),
            ice_servers: self.ice_servers.clone(),
            events,
            pc: None,
            data_channel: None,
        }))
    }
}

struct WebRtcSession {
    remote: UserId,
    ice_servers: Vec<String>,
    events: MediaEvents,
    pc: Option<Arc<RTCPeerConnection>>,
    data_channel: Option<Arc<RTCDataChannel>>,
}

impl WebRtcSession {
    async fn peer_connection(&mut self) -> Result<Arc<RTCPeerConnection>, MediaError> {
        if let Some(pc) = &self.pc {
            return Ok(pc.clone());
        }

        let mut m = MediaEngine::default();
        m.register_default_codecs().map_err(other)?;
        let registry = register_default_interceptors(Registry::new(), &mut m).map_err(other)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = if self.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };
        let config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(config).await.map_err(other)?);

        let events = self.events.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let events = events.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                if let Ok(value) = serde_json::to_value(&init) {
                    events.local_candidate(Candidate(value));
                }
            })
        }));

        let events = self.events.clone();
        let remote = self.remote.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let events = events.clone();
            let remote = remote.clone();
            Box::pin(async move {
                info!(peer = %remote, "Peer connection state changed: {}", s);
                if s == RTCPeerConnectionState::Failed {
                    events.connection_failed(format!("peer connection {s}"));
                }
            })
        }));

        let events = self.events.clone();
        pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            debug!("Remote data channel '{}' announced", dc.label());
            watch_open(&dc, events.clone());
            Box::pin(async {})
        }));

        self.pc = Some(pc.clone());
        Ok(pc)
    }
}

fn watch_open(dc: &Arc<RTCDataChannel>, events: MediaEvents) {
    dc.on_open(Box::new(move || {
        let events = events.clone();
        Box::pin(async move {
            events.data_channel_open();
        })
    }));
}

fn other(e: webrtc::Error) -> MediaError {
    MediaError::Other(e.into())
}

fn rejected(e: impl std::fmt::Display) -> MediaError {
    MediaError::Rejected(e.to_string())
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, MediaError> {
    serde_json::from_value(desc.0).map_err(rejected)
}

fn from_rtc(desc: &RTCSessionDescription) -> Result<SessionDescription, MediaError> {
    serde_json::to_value(desc)
        .map(SessionDescription)
        .map_err(rejected)
}

#[async_trait]
impl MediaSession for WebRtcSession {
    async fn acquire_local_media(&mut self) -> Result<(), MediaError> {
        self.peer_connection().await.map(|_| ())
    }

    async fn create_data_channel(&mut self, label: &str) -> Result<(), MediaError> {
        let pc = self.peer_connection().await?;
        let dc = pc.create_data_channel(label, None).await.map_err(other)?;
        watch_open(&dc, self.events.clone());
        self.data_channel = Some(dc);
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<SessionDescription, MediaError> {
        let pc = self.peer_connection().await?;
        let offer = pc.create_offer(None).await.map_err(rejected)?;
        from_rtc(&offer)
    }

    async fn create_answer(&mut self) -> Result<SessionDescription, MediaError> {
        let pc = self.peer_connection().await?;
        let answer = pc.create_answer(None).await.map_err(rejected)?;
        from_rtc(&answer)
    }

    async fn set_local_description(&mut self, desc: SessionDescription) -> Result<(), MediaError> {
        let pc = self.peer_connection().await?;
        pc.set_local_description(to_rtc(desc)?)
            .await
            .map_err(rejected)
    }

    async fn set_remote_description(
        &mut self,
        desc: SessionDescription,
    ) -> Result<(), MediaError> {
        let pc = self.peer_connection().await?;
        pc.set_remote_description(to_rtc(desc)?)
            .await
            .map_err(rejected)
    }

    async fn add_candidate(&mut self, candidate: Candidate) -> Result<(), MediaError> {
        let pc = self.pc.clone().ok_or(MediaError::Closed)?;
        let init: RTCIceCandidateInit = serde_json::from_value(candidate.0).map_err(rejected)?;
        pc.add_ice_candidate(init).await.map_err(rejected)
    }

    async fn close(&mut self) -> Result<(), MediaError> {
        if let Some(dc) = self.data_channel.take() {
            let _ = dc.close().await;
        }
        if let Some(pc) = self.pc.take() {
            pc.close().await.map_err(other)?;
        }
        Ok(())
    }
}
