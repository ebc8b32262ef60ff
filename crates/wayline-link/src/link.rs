use mavlink::common::{
    MavAutopilot, MavCmd, MavFrame, MavLandedState, MavMessage, MavMissionResult, MavMissionType, MavModeFlag,
    MavResult, MavType, COMMAND_INT_DATA, COMMAND_LONG_DATA, MISSION_CLEAR_ALL_DATA,
    MISSION_COUNT_DATA, MISSION_ITEM_INT_DATA,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use wayline_geo::Coordinate;

use crate::modes;
use crate::telemetry::{GpsFix, RcChannels, Wind};
use crate::transport::Transport;
use crate::LinkError;

/// Magic param2 of `MAV_CMD_COMPONENT_ARM_DISARM` that bypasses ArduPilot's arming checks.
pub const FORCE_ARM_MAGIC: f32 = 21196.0;

/// `EXTENDED_SYS_STATE` message id, the landed-state stream.
pub const EXTENDED_SYS_STATE_ID: u32 = 245;

/// Request/acknowledge primitives against one vehicle.
pub struct Link<T: Transport> {
    transport: T,
    target_system: u8,
    target_component: u8,
    vehicle: MavType,
    request_timeout: Duration,
}

impl<T: Transport> Link<T> {
    /// Wait for the vehicle heartbeat and bind to the system that sent it.
    ///
    /// Heartbeats from other ground stations, and from components that are not an autopilot
    /// (companion computers, gimbals, cameras), are ignored. Failing here is fatal for the session.
    pub async fn connect(
        mut transport: T,
        request_timeout: Duration,
        heartbeat_timeout: Duration,
    ) -> Result<Self, LinkError> {
        let deadline = Instant::now() + heartbeat_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(LinkError::NoHeartbeat);
            }
            match transport.recv(remaining).await? {
                Some((hdr, MavMessage::HEARTBEAT(hb)))
                    if hb.mavtype != MavType::MAV_TYPE_GCS
                        && hb.autopilot != MavAutopilot::MAV_AUTOPILOT_INVALID =>
                {
                    info!(
                        "link: heartbeat from system {} component {} ({:?})",
                        hdr.system_id, hdr.component_id, hb.mavtype
                    );
                    return Ok(Self {
                        transport,
                        target_system: hdr.system_id,
                        target_component: hdr.component_id,
                        vehicle: hb.mavtype,
                        request_timeout,
                    });
                }
                Some(_) => continue,
                None => return Err(LinkError::NoHeartbeat),
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn vehicle(&self) -> MavType {
        self.vehicle
    }

    pub fn target(&self) -> (u8, u8) {
        (self.target_system, self.target_component)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub async fn send(&mut self, msg: MavMessage) -> Result<(), LinkError> {
        self.transport.send(&msg).await
    }

    /// Receive until `pick` accepts a message or `timeout` passes. Other messages are dropped.
    pub async fn recv_matching<R>(
        &mut self,
        timeout: Duration,
        mut pick: impl FnMut(&MavMessage) -> Option<R>,
    ) -> Result<R, LinkError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(LinkError::Timeout);
            }
            match self.transport.recv(remaining).await? {
                Some((_, msg)) => {
                    if let Some(r) = pick(&msg) {
                        return Ok(r);
                    }
                }
                None => return Err(LinkError::Timeout),
            }
        }
    }

    // ----- commands -----

    /// Send `COMMAND_LONG` and wait for its `COMMAND_ACK`.
    pub async fn command_long(&mut self, command: MavCmd, params: [f32; 7]) -> Result<(), LinkError> {
        let cmd = COMMAND_LONG_DATA {
            target_system: self.target_system,
            target_component: self.target_component,
            command,
            confirmation: 0,
            param1: params[0],
            param2: params[1],
            param3: params[2],
            param4: params[3],
            param5: params[4],
            param6: params[5],
            param7: params[6],
        };
        debug!("link: sending {:?} {:?}", command, params);
        self.send(MavMessage::COMMAND_LONG(cmd)).await?;
        self.await_command_ack(command).await
    }

    /// Wait for the ack of `command`, skipping acks of anything else and `IN_PROGRESS` updates.
    async fn await_command_ack(&mut self, command: MavCmd) -> Result<(), LinkError> {
        let timeout = self.request_timeout;
        let result = self
            .recv_matching(timeout, |msg| match msg {
                MavMessage::COMMAND_ACK(ack)
                    if ack.command == command && ack.result != MavResult::MAV_RESULT_IN_PROGRESS =>
                {
                    Some(ack.result)
                }
                _ => None,
            })
            .await
            .map_err(|e| {
                warn!("link: no ack for {:?}: {}", command, e);
                e
            })?;

        if result == MavResult::MAV_RESULT_ACCEPTED {
            Ok(())
        } else {
            warn!("link: {:?} rejected: {:?}", command, result);
            Err(LinkError::CommandRejected { command, result })
        }
    }

    pub async fn set_mode(&mut self, name: &str) -> Result<(), LinkError> {
        let Some(mode) = modes::lookup(self.vehicle, name) else {
            warn!("link: unknown mode {} (try: {})", name, modes::names(self.vehicle).join(", "));
            return Err(LinkError::UnknownMode(name.to_string()));
        };
        info!("link: set mode {}", name);
        let flag = MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED.bits() as f32;
        self.command_long(MavCmd::MAV_CMD_DO_SET_MODE, [flag, mode as f32, 0.0, 0.0, 0.0, 0.0, 0.0])
            .await
    }

    pub async fn arm(&mut self, force: bool) -> Result<(), LinkError> {
        info!("link: arming{}", if force { " (forced)" } else { "" });
        self.arm_disarm(1.0, force).await
    }

    pub async fn disarm(&mut self, force: bool) -> Result<(), LinkError> {
        info!("link: disarming{}", if force { " (forced)" } else { "" });
        self.arm_disarm(0.0, force).await
    }

    async fn arm_disarm(&mut self, arm: f32, force: bool) -> Result<(), LinkError> {
        let magic = if force { FORCE_ARM_MAGIC } else { 0.0 };
        self.command_long(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, [arm, magic, 0.0, 0.0, 0.0, 0.0, 0.0])
            .await
    }

    pub async fn enable_geofence(&mut self) -> Result<(), LinkError> {
        info!("link: enabling geofence");
        self.command_long(MavCmd::MAV_CMD_DO_FENCE_ENABLE, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .await
    }

    /// Disable the fence, or only its floor when `floor_only`.
    pub async fn disable_geofence(&mut self, floor_only: bool) -> Result<(), LinkError> {
        info!("link: disabling geofence{}", if floor_only { " floor" } else { "" });
        let p1 = if floor_only { 2.0 } else { 0.0 };
        self.command_long(MavCmd::MAV_CMD_DO_FENCE_ENABLE, [p1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .await
    }

    /// Set the home position.
    ///
    /// `Coordinate::origin()` means "use the current position". A zero altitude is replaced by
    /// the vehicle's current GPS altitude before sending.
    pub async fn set_home(&mut self, home: &Coordinate) -> Result<(), LinkError> {
        if home.is_origin() {
            info!("link: set home to current position");
            return self
                .command_long(MavCmd::MAV_CMD_DO_SET_HOME, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
                .await;
        }

        let mut alt = home.alt;
        if alt == 0.0 {
            let timeout = self.request_timeout;
            let fix = self.receive_gps(timeout).await?;
            alt = fix.position.alt;
            debug!("link: home altitude taken from gps: {}m", alt);
        }

        let (lat, lon) = home.to_fixed();
        info!("link: set home {}", home.with_altitude(alt));
        let cmd = COMMAND_INT_DATA {
            target_system: self.target_system,
            target_component: self.target_component,
            frame: MavFrame::MAV_FRAME_GLOBAL,
            command: MavCmd::MAV_CMD_DO_SET_HOME,
            x: lat,
            y: lon,
            z: alt as f32,
            ..Default::default()
        };
        self.send(MavMessage::COMMAND_INT(cmd)).await?;
        self.await_command_ack(MavCmd::MAV_CMD_DO_SET_HOME).await
    }

    pub async fn set_servo(&mut self, servo: u8, pwm: u16) -> Result<(), LinkError> {
        info!("link: servo {} -> {}", servo, pwm);
        self.command_long(
            MavCmd::MAV_CMD_DO_SET_SERVO,
            [servo as f32, pwm as f32, 0.0, 0.0, 0.0, 0.0, 0.0],
        )
        .await
    }

    pub async fn set_message_interval(&mut self, message_id: u32, interval_us: i32) -> Result<(), LinkError> {
        debug!("link: message {} every {}us", message_id, interval_us);
        self.command_long(
            MavCmd::MAV_CMD_SET_MESSAGE_INTERVAL,
            [message_id as f32, interval_us as f32, 0.0, 0.0, 0.0, 0.0, 0.0],
        )
        .await
    }

    pub async fn disable_message_interval(&mut self, message_id: u32) -> Result<(), LinkError> {
        self.set_message_interval(message_id, -1).await
    }

    pub async fn set_current_mission_index(&mut self, seq: u16) -> Result<(), LinkError> {
        info!("link: jump to mission item {}", seq);
        self.command_long(
            MavCmd::MAV_CMD_DO_SET_MISSION_CURRENT,
            [seq as f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        )
        .await
    }

    pub async fn start_mission(&mut self, first: u16, last: u16) -> Result<(), LinkError> {
        info!("link: start mission {}..={}", first, last);
        self.command_long(
            MavCmd::MAV_CMD_MISSION_START,
            [first as f32, last as f32, 0.0, 0.0, 0.0, 0.0, 0.0],
        )
        .await
    }

    // ----- mission transfer -----

    pub async fn send_mission_count(&mut self, count: u16, mission_type: MavMissionType) -> Result<(), LinkError> {
        debug!("link: mission count {} ({:?})", count, mission_type);
        let msg = MISSION_COUNT_DATA {
            target_system: self.target_system,
            target_component: self.target_component,
            count,
            mission_type,
            ..Default::default()
        };
        self.send(MavMessage::MISSION_COUNT(msg)).await
    }

    /// Send one item, addressed to the bound vehicle.
    pub async fn send_mission_item(&mut self, mut item: MISSION_ITEM_INT_DATA) -> Result<(), LinkError> {
        item.target_system = self.target_system;
        item.target_component = self.target_component;
        debug!("link: mission item {}", item.seq);
        self.send(MavMessage::MISSION_ITEM_INT(item)).await
    }

    pub async fn send_clear_all(&mut self, mission_type: MavMissionType) -> Result<(), LinkError> {
        debug!("link: clear all ({:?})", mission_type);
        let msg = MISSION_CLEAR_ALL_DATA {
            target_system: self.target_system,
            target_component: self.target_component,
            mission_type,
            ..Default::default()
        };
        self.send(MavMessage::MISSION_CLEAR_ALL(msg)).await
    }

    /// Sequence number the vehicle asks for next.
    pub async fn await_mission_request(&mut self, timeout: Duration) -> Result<u16, LinkError> {
        self.recv_matching(timeout, |msg| match msg {
            MavMessage::MISSION_REQUEST_INT(r) => Some(r.seq),
            MavMessage::MISSION_REQUEST(r) => Some(r.seq),
            _ => None,
        })
        .await
    }

    /// Final verdict of a transfer or clear. A non-accepted ack carries the vehicle's reason.
    pub async fn await_mission_ack(&mut self) -> Result<(), LinkError> {
        let timeout = self.request_timeout;
        let result = self
            .recv_matching(timeout, |msg| match msg {
                MavMessage::MISSION_ACK(ack) => Some(ack.mavtype),
                _ => None,
            })
            .await?;
        if result == MavMissionResult::MAV_MISSION_ACCEPTED {
            Ok(())
        } else {
            warn!("link: mission ack {:?}", result);
            Err(LinkError::MissionRejected(result))
        }
    }

    // ----- telemetry -----

    pub async fn await_mission_item_reached(&mut self, timeout: Duration) -> Result<u16, LinkError> {
        self.recv_matching(timeout, |msg| match msg {
            MavMessage::MISSION_ITEM_REACHED(r) => Some(r.seq),
            _ => None,
        })
        .await
    }

    /// Active mission item, from the `MISSION_CURRENT` broadcast.
    pub async fn await_current_mission_index(&mut self) -> Result<u16, LinkError> {
        let timeout = self.request_timeout;
        self.recv_matching(timeout, |msg| match msg {
            MavMessage::MISSION_CURRENT(c) => Some(c.seq),
            _ => None,
        })
        .await
    }

    pub async fn receive_gps(&mut self, timeout: Duration) -> Result<GpsFix, LinkError> {
        self.recv_matching(timeout, |msg| match msg {
            MavMessage::GLOBAL_POSITION_INT(d) => Some(GpsFix::from(d)),
            _ => None,
        })
        .await
    }

    pub async fn receive_wind(&mut self, timeout: Duration) -> Result<Wind, LinkError> {
        self.recv_matching(timeout, |msg| match msg {
            MavMessage::WIND_COV(d) => Some(Wind::from(d)),
            _ => None,
        })
        .await
    }

    pub async fn receive_landing_status(&mut self, timeout: Duration) -> Result<MavLandedState, LinkError> {
        self.recv_matching(timeout, |msg| match msg {
            MavMessage::EXTENDED_SYS_STATE(d) => Some(d.landed_state),
            _ => None,
        })
        .await
    }

    pub async fn receive_channel_input(&mut self, timeout: Duration) -> Result<RcChannels, LinkError> {
        self.recv_matching(timeout, |msg| match msg {
            MavMessage::RC_CHANNELS(d) => Some(RcChannels::from(d)),
            _ => None,
        })
        .await
    }
}
