//! Scripted in-memory vehicle.
//!
//! Replies to what the link sends (command acks, mission requests, mission acks) are queued
//! immediately and delivered before any telemetry. Enabled message streams are emitted only
//! when both queues are empty, one frame per receive.

use mavlink::common::{
    MavAutopilot, MavCmd, MavLandedState, MavMessage, MavMissionResult, MavMissionType, MavResult, MavType,
    COMMAND_ACK_DATA, EXTENDED_SYS_STATE_DATA, GLOBAL_POSITION_INT_DATA, HEARTBEAT_DATA,
    MISSION_ACK_DATA, MISSION_ITEM_INT_DATA, MISSION_ITEM_REACHED_DATA, MISSION_REQUEST_INT_DATA,
    RC_CHANNELS_DATA,
};
use mavlink::MavHeader;
use std::collections::VecDeque;
use std::time::Duration;

use crate::link::EXTENDED_SYS_STATE_ID;
use crate::transport::Transport;
use crate::LinkError;

pub const GLOBAL_POSITION_INT_ID: u32 = 33;
pub const RC_CHANNELS_ID: u32 = 65;

/// One frame crossing the mock, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Exchange {
    Sent(MavMessage),
    Received(MavMessage),
}

pub struct MockVehicle {
    latency: Duration,
    replies: VecDeque<MavMessage>,
    telemetry: VecDeque<MavMessage>,
    log: Vec<Exchange>,

    command_results: Vec<(MavCmd, MavResult)>,
    muted: Vec<MavCmd>,

    request_script: Option<Vec<u16>>,
    pending_requests: VecDeque<u16>,
    uploading: MavMissionType,
    mission_ack: Option<MavMissionResult>,
    clear_ack: Option<MavMissionResult>,
    auto_reach: bool,

    streams: Vec<u32>,
    next_stream: usize,
    landed_state: MavLandedState,
    position: GLOBAL_POSITION_INT_DATA,
    rc: RC_CHANNELS_DATA,
}

impl MockVehicle {
    /// A fixed-wing vehicle whose heartbeat is already waiting.
    pub fn plane() -> Self {
        Self::with_type(MavType::MAV_TYPE_FIXED_WING)
    }

    pub fn with_type(vehicle: MavType) -> Self {
        let mut mock = Self::silent();
        mock.replies.push_back(MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            mavtype: vehicle,
            autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
            ..Default::default()
        }));
        mock
    }

    /// No heartbeat, no replies until scripted.
    pub fn silent() -> Self {
        Self {
            latency: Duration::from_millis(10),
            replies: VecDeque::new(),
            telemetry: VecDeque::new(),
            log: Vec::new(),
            command_results: Vec::new(),
            muted: Vec::new(),
            request_script: None,
            pending_requests: VecDeque::new(),
            uploading: MavMissionType::MAV_MISSION_TYPE_MISSION,
            mission_ack: Some(MavMissionResult::MAV_MISSION_ACCEPTED),
            clear_ack: Some(MavMissionResult::MAV_MISSION_ACCEPTED),
            auto_reach: false,
            streams: Vec::new(),
            next_stream: 0,
            landed_state: MavLandedState::MAV_LANDED_STATE_IN_AIR,
            position: GLOBAL_POSITION_INT_DATA::default(),
            rc: RC_CHANNELS_DATA::default(),
        }
    }

    // ----- scripting -----

    pub fn reject_command(&mut self, command: MavCmd, result: MavResult) {
        self.command_results.retain(|(c, _)| *c != command);
        self.command_results.push((command, result));
    }

    /// Never acknowledge `command`.
    pub fn mute_command(&mut self, command: MavCmd) {
        self.muted.push(command);
    }

    /// Sequence numbers to request during every upload, in order. Default is `0..count`.
    pub fn request_order(&mut self, seqs: Vec<u16>) {
        self.request_script = Some(seqs);
    }

    /// Verdict after the last scripted request. `None` never acks.
    pub fn mission_ack(&mut self, result: Option<MavMissionResult>) {
        self.mission_ack = result;
    }

    pub fn clear_ack(&mut self, result: Option<MavMissionResult>) {
        self.clear_ack = result;
    }

    /// Report every item of a started mission as reached.
    pub fn auto_reach(&mut self, on: bool) {
        self.auto_reach = on;
    }

    pub fn set_landed_state(&mut self, state: MavLandedState) {
        self.landed_state = state;
    }

    /// Start streaming `GLOBAL_POSITION_INT` at this position (alt in mm).
    pub fn set_position(&mut self, lat: i32, lon: i32, alt_mm: i32) {
        self.position = GLOBAL_POSITION_INT_DATA { lat, lon, alt: alt_mm, hdg: u16::MAX, ..Default::default() };
        self.enable_stream(GLOBAL_POSITION_INT_ID);
    }

    /// Start streaming `RC_CHANNELS` with `channel` (1..=8) at `pwm`.
    pub fn set_rc_channel(&mut self, channel: u8, pwm: u16) {
        let slot = match channel {
            1 => &mut self.rc.chan1_raw,
            2 => &mut self.rc.chan2_raw,
            3 => &mut self.rc.chan3_raw,
            4 => &mut self.rc.chan4_raw,
            5 => &mut self.rc.chan5_raw,
            6 => &mut self.rc.chan6_raw,
            7 => &mut self.rc.chan7_raw,
            _ => &mut self.rc.chan8_raw,
        };
        *slot = pwm;
        self.rc.chancount = 8;
        self.enable_stream(RC_CHANNELS_ID);
    }

    pub fn push_telemetry(&mut self, msg: MavMessage) {
        self.telemetry.push_back(msg);
    }

    pub fn enable_stream(&mut self, id: u32) {
        if !self.streams.contains(&id) {
            self.streams.push(id);
        }
    }

    // ----- inspection -----

    pub fn log(&self) -> &[Exchange] {
        &self.log
    }

    pub fn sent(&self) -> Vec<&MavMessage> {
        self.log
            .iter()
            .filter_map(|e| match e {
                Exchange::Sent(m) => Some(m),
                Exchange::Received(_) => None,
            })
            .collect()
    }

    pub fn commands(&self) -> Vec<mavlink::common::COMMAND_LONG_DATA> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                MavMessage::COMMAND_LONG(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn int_commands(&self) -> Vec<mavlink::common::COMMAND_INT_DATA> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                MavMessage::COMMAND_INT(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn items_sent(&self) -> Vec<MISSION_ITEM_INT_DATA> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                MavMessage::MISSION_ITEM_INT(i) => Some(i.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn streams(&self) -> &[u32] {
        &self.streams
    }

    // ----- vehicle behaviour -----

    fn ack(&mut self, command: MavCmd) {
        if self.muted.contains(&command) {
            return;
        }
        let result = self
            .command_results
            .iter()
            .find(|(c, _)| *c == command)
            .map(|(_, r)| *r)
            .unwrap_or(MavResult::MAV_RESULT_ACCEPTED);
        self.replies.push_back(MavMessage::COMMAND_ACK(COMMAND_ACK_DATA {
            command,
            result,
            ..Default::default()
        }));
    }

    fn request(&mut self, seq: u16) {
        self.replies.push_back(MavMessage::MISSION_REQUEST_INT(MISSION_REQUEST_INT_DATA {
            seq,
            mission_type: self.uploading,
            ..Default::default()
        }));
    }

    fn mission_verdict(&mut self, result: Option<MavMissionResult>, mission_type: MavMissionType) {
        if let Some(mavtype) = result {
            self.replies.push_back(MavMessage::MISSION_ACK(MISSION_ACK_DATA {
                mavtype,
                mission_type,
                ..Default::default()
            }));
        }
    }

    fn react(&mut self, msg: &MavMessage) {
        match msg {
            MavMessage::COMMAND_LONG(c) => {
                let accepted = !self.muted.contains(&c.command)
                    && !self.command_results.iter().any(|(cmd, _)| *cmd == c.command);
                if accepted {
                    match c.command {
                        MavCmd::MAV_CMD_SET_MESSAGE_INTERVAL => {
                            let id = c.param1 as u32;
                            if c.param2 < 0.0 {
                                self.streams.retain(|s| *s != id);
                            } else {
                                self.enable_stream(id);
                            }
                        }
                        MavCmd::MAV_CMD_MISSION_START if self.auto_reach => {
                            let (first, last) = (c.param1 as u16, c.param2 as u16);
                            for seq in first..=last {
                                self.telemetry.push_back(MavMessage::MISSION_ITEM_REACHED(
                                    MISSION_ITEM_REACHED_DATA { seq },
                                ));
                            }
                        }
                        _ => {}
                    }
                }
                self.ack(c.command);
            }
            MavMessage::COMMAND_INT(c) => self.ack(c.command),
            MavMessage::MISSION_COUNT(c) => {
                self.uploading = c.mission_type;
                let script = self.request_script.clone().unwrap_or_else(|| (0..c.count).collect());
                self.pending_requests = script.into();
                match self.pending_requests.pop_front() {
                    Some(seq) if c.count > 0 => self.request(seq),
                    _ => self.mission_verdict(self.mission_ack, c.mission_type),
                }
            }
            MavMessage::MISSION_ITEM_INT(_) => match self.pending_requests.pop_front() {
                Some(seq) => self.request(seq),
                None => self.mission_verdict(self.mission_ack, self.uploading),
            },
            MavMessage::MISSION_CLEAR_ALL(c) => self.mission_verdict(self.clear_ack, c.mission_type),
            _ => {}
        }
    }

    fn stream_frame(&mut self) -> Option<MavMessage> {
        if self.streams.is_empty() {
            return None;
        }
        let id = self.streams[self.next_stream % self.streams.len()];
        self.next_stream = self.next_stream.wrapping_add(1);
        match id {
            EXTENDED_SYS_STATE_ID => Some(MavMessage::EXTENDED_SYS_STATE(EXTENDED_SYS_STATE_DATA {
                landed_state: self.landed_state,
                ..Default::default()
            })),
            GLOBAL_POSITION_INT_ID => Some(MavMessage::GLOBAL_POSITION_INT(self.position.clone())),
            RC_CHANNELS_ID => Some(MavMessage::RC_CHANNELS(self.rc.clone())),
            _ => None,
        }
    }
}

impl Transport for MockVehicle {
    async fn send(&mut self, msg: &MavMessage) -> Result<(), LinkError> {
        self.log.push(Exchange::Sent(msg.clone()));
        self.react(msg);
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Option<(MavHeader, MavMessage)>, LinkError> {
        if timeout < self.latency {
            tokio::time::sleep(timeout).await;
            return Ok(None);
        }
        let next = match self.replies.pop_front().or_else(|| self.telemetry.pop_front()) {
            Some(msg) => Some(msg),
            None => self.stream_frame(),
        };
        match next {
            Some(msg) => {
                tokio::time::sleep(self.latency).await;
                self.log.push(Exchange::Received(msg.clone()));
                let hdr = MavHeader { system_id: 1, component_id: 1, sequence: 0 };
                Ok(Some((hdr, msg)))
            }
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }
}
