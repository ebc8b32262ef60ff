use mavlink::common::MavLandedState;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use wayline_geo::Coordinate;
use wayline_link::link::EXTENDED_SYS_STATE_ID;
use wayline_link::telemetry::RC_CHANNEL_COUNT;
use wayline_link::{Link, LinkError, Transport};
use wayline_mission::{LoadWindow, MissionError, MissionStore, PlanType};

use crate::{AirdropPlan, FlightConfig, FlightError};

/// Landed-state stream rate while waiting for touchdown.
const LANDED_STATE_INTERVAL_US: i32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    Uninitialized,
    PreflightChecked,
    /// Flying queued mission number `leg`, 0 being takeoff.
    Airborne { leg: usize },
    Landing,
    Landed,
}

/// Supervises one flight: preflight, takeoff, the mission queue and landing.
///
/// The queue head is always the mission active on the vehicle (or about to be).
pub struct Flight<T: Transport> {
    link: Link<T>,
    cfg: FlightConfig,
    missions: VecDeque<MissionStore>,
    takeoff: MissionStore,
    detect: MissionStore,
    land: MissionStore,
    airdrop: MissionStore,
    geofence: MissionStore,
    preflight_done: bool,
    state: FlightState,
    leg: usize,
}

impl<T: Transport> Flight<T> {
    pub fn new(link: Link<T>, cfg: FlightConfig) -> Self {
        let budget = cfg.mission_send_timeout();
        let store = |plan| MissionStore::new(plan).with_send_timeout(budget);
        Self {
            link,
            missions: VecDeque::new(),
            takeoff: store(PlanType::Waypoint),
            detect: store(PlanType::Waypoint),
            land: store(PlanType::Waypoint),
            airdrop: store(PlanType::Waypoint),
            geofence: store(PlanType::Geofence),
            cfg,
            preflight_done: false,
            state: FlightState::Uninitialized,
            leg: 0,
        }
    }

    pub fn link(&self) -> &Link<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link<T> {
        &mut self.link
    }

    pub fn state(&self) -> FlightState {
        self.state
    }

    pub fn preflight_done(&self) -> bool {
        self.preflight_done
    }

    pub fn queued(&self) -> &VecDeque<MissionStore> {
        &self.missions
    }

    pub fn airdrop_mission(&self) -> &MissionStore {
        &self.airdrop
    }

    fn store(&self, plan: PlanType) -> MissionStore {
        MissionStore::new(plan).with_send_timeout(self.cfg.mission_send_timeout())
    }

    // ----- preflight & takeoff -----

    /// Set home, upload the geofence, load (not upload) the land mission, enable the fence.
    pub async fn preflight_check(
        &mut self,
        land_file: impl AsRef<Path>,
        geofence_file: impl AsRef<Path>,
        home: &Coordinate,
    ) -> Result<(), FlightError> {
        info!("flight: preflight check");
        self.link.set_home(home).await?;
        self.geofence.load_file(geofence_file, LoadWindow::all(), true)?;
        self.geofence.send(&mut self.link).await?;
        self.land.load_file(land_file, LoadWindow::all(), true)?;
        self.link.enable_geofence().await?;

        self.preflight_done = true;
        self.state = FlightState::PreflightChecked;
        info!("flight: preflight complete, {} fence items", self.geofence.len());
        Ok(())
    }

    /// Upload the takeoff plan, settle, switch to AUTO and arm.
    pub async fn takeoff(&mut self, file: impl AsRef<Path>) -> Result<(), FlightError> {
        if !self.preflight_done {
            warn!("flight: takeoff refused, preflight not done");
            return Err(FlightError::PreflightNotDone);
        }
        self.takeoff.load_file(file, LoadWindow::all(), true)?;
        self.takeoff.send(&mut self.link).await?;
        self.missions.push_front(self.takeoff.clone());

        debug!("flight: settling for {:?}", self.cfg.takeoff_settle());
        tokio::time::sleep(self.cfg.takeoff_settle()).await;
        self.link.set_mode("AUTO").await?;
        self.link.arm(false).await?;

        self.leg = 0;
        self.state = FlightState::Airborne { leg: 0 };
        info!("flight: takeoff, {} items", self.takeoff.len());
        Ok(())
    }

    // ----- building the queue -----

    /// Splice the items of `plan` into `file` at row `insert_index`.
    ///
    /// Rows after the insertion point are renumbered to follow the synthesized items. Returns
    /// the length of the built mission.
    pub fn build_airdrop_mission(
        &mut self,
        target: &Coordinate,
        file: impl AsRef<Path>,
        insert_index: usize,
        altitude: f64,
        plan: &AirdropPlan,
    ) -> Result<usize, FlightError> {
        let file = file.as_ref();
        let mut store = self.store(PlanType::Waypoint);
        store.load_file(file, LoadWindow::range(0, Some(insert_index)), true)?;

        let first = insert_index as u16;
        let synthesized = plan.items(target, altitude, first);
        let n = synthesized.len() as u16;
        for item in synthesized {
            store.push(item);
        }

        let tail = LoadWindow::range(insert_index, None).renumbered(first + n);
        match store.load_file(file, tail, false) {
            Ok(_) => {}
            // inserting after the last row leaves no tail
            Err(MissionError::StartOutOfRange { start, rows }) if start == rows => {}
            Err(e) => return Err(e.into()),
        }

        info!(
            "flight: airdrop mission built, {} items ({} synthesized at {})",
            store.len(),
            n,
            insert_index
        );
        self.airdrop = store;
        Ok(self.airdrop.len())
    }

    pub fn append_mission(&mut self, file: impl AsRef<Path>) -> Result<(), FlightError> {
        let mut store = self.store(PlanType::Waypoint);
        store.load_file(file, LoadWindow::all(), true)?;
        self.enqueue(store, "mission");
        Ok(())
    }

    pub fn append_airdrop_mission(&mut self) -> Result<(), FlightError> {
        if self.airdrop.is_empty() {
            return Err(FlightError::AirdropNotBuilt);
        }
        self.enqueue(self.airdrop.clone(), "airdrop");
        Ok(())
    }

    /// Queue the detect mission, loading `file` first when given.
    pub fn append_detect_mission(&mut self, file: Option<&Path>) -> Result<(), FlightError> {
        if let Some(file) = file {
            self.detect.load_file(file, LoadWindow::all(), true)?;
        }
        if self.detect.is_empty() {
            return Err(FlightError::DetectNotLoaded);
        }
        self.enqueue(self.detect.clone(), "detect");
        Ok(())
    }

    pub fn append_land_mission(&mut self) -> Result<(), FlightError> {
        if self.land.is_empty() {
            return Err(FlightError::LandNotLoaded);
        }
        self.enqueue(self.land.clone(), "land");
        Ok(())
    }

    fn enqueue(&mut self, store: MissionStore, what: &str) {
        info!("flight: queued {} mission, {} items (queue {})", what, store.len(), self.missions.len() + 1);
        self.missions.push_back(store);
    }

    // ----- in flight -----

    /// Hand off from the active mission to the next queued one.
    ///
    /// Waits for the active mission's last item, clears it, then uploads the next mission.
    /// With nothing queued behind the active mission this only marks the flight as landing.
    pub async fn wait_and_send_next_mission(&mut self) -> Result<(), FlightError> {
        let current = self.missions.pop_front().ok_or(FlightError::NoMissionQueued)?;
        if self.missions.is_empty() {
            info!("flight: last mission active, landing next");
            self.state = FlightState::Landing;
            return Ok(());
        }

        if let Some(last) = current.last_seq() {
            if let Err(e) = self.wait_for_waypoint_reached(last, self.cfg.waypoint_timeout()).await {
                warn!("flight: leg {} did not finish: {}", self.leg, e);
                self.missions.push_front(current);
                return Err(e);
            }
        }

        if let Err(e) = current.clear(&mut self.link).await {
            error!("flight: could not clear leg {}, next mission not sent: {}", self.leg, e);
            return Err(e.into());
        }

        let next = self.missions.front().ok_or(FlightError::NoMissionQueued)?;
        next.send(&mut self.link).await?;
        self.link.set_mode("AUTO").await?;

        self.leg += 1;
        self.state = FlightState::Airborne { leg: self.leg };
        info!("flight: leg {} active, {} items", self.leg, next.len());
        Ok(())
    }

    /// Block until an item at or past `target` is reported reached. Returns the highest seen.
    pub async fn wait_for_waypoint_reached(&mut self, target: u16, timeout: Duration) -> Result<u16, FlightError> {
        let deadline = Instant::now() + timeout;
        let mut highest: Option<u16> = None;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(LinkError::Timeout.into());
            }
            let seq = self.link.await_mission_item_reached(remaining).await?;
            let watermark = highest.map_or(seq, |h| h.max(seq));
            highest = Some(watermark);
            debug!("flight: reached {} (highest {}, waiting for {})", seq, watermark, target);
            if watermark >= target {
                return Ok(watermark);
            }
        }
    }

    /// Poll the landed state until on ground. The stream enabled here is disabled on every exit.
    pub async fn wait_for_landed(&mut self, timeout: Duration) -> Result<(), FlightError> {
        // an unacknowledged enable may still have started the stream
        if let Err(e) = self.link.set_message_interval(EXTENDED_SYS_STATE_ID, LANDED_STATE_INTERVAL_US).await {
            if let Err(d) = self.link.disable_message_interval(EXTENDED_SYS_STATE_ID).await {
                debug!("flight: disabling landed-state stream after failed enable: {}", d);
            }
            return Err(e.into());
        }
        let landed = self.poll_landed(timeout).await;
        let disabled = self.link.disable_message_interval(EXTENDED_SYS_STATE_ID).await;

        landed?;
        disabled?;
        self.state = FlightState::Landed;
        info!("flight: landed");
        Ok(())
    }

    async fn poll_landed(&mut self, timeout: Duration) -> Result<(), FlightError> {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                warn!("flight: not on ground after {:?}", timeout);
                return Err(LinkError::Timeout.into());
            }
            let wait = self.link.request_timeout().min(deadline - now);
            match self.link.receive_landing_status(wait).await {
                Ok(MavLandedState::MAV_LANDED_STATE_ON_GROUND) => return Ok(()),
                Ok(state) => debug!("flight: landed state {:?}", state),
                Err(LinkError::Timeout) => debug!("flight: no landed state within {:?}", wait),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Wait for landing; if it does not come, resend the land mission once and wait again.
    pub async fn land(&mut self) -> Result<(), FlightError> {
        let timeout = self.cfg.landing_timeout();
        match self.wait_for_landed(timeout).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("flight: landing not confirmed ({}), resending land mission", e);
                tokio::time::sleep(self.cfg.landing_retry_delay()).await;
                self.resend_land_mission().await?;
                self.wait_for_landed(timeout).await
            }
        }
    }

    /// Wait for RC `channel` (1-based) to sit within `value ± tolerance`. Returns the raw value.
    ///
    /// `timeout` bounds each telemetry receive, `window` the whole wait.
    pub async fn wait_for_channel_input(
        &mut self,
        channel: u8,
        value: u16,
        tolerance: u16,
        timeout: Duration,
        window: Duration,
    ) -> Result<u16, FlightError> {
        if channel == 0 || channel as usize > RC_CHANNEL_COUNT {
            return Err(FlightError::InvalidChannel(channel));
        }
        let low = value.saturating_sub(tolerance);
        let high = value.saturating_add(tolerance);

        let deadline = Instant::now() + window;
        loop {
            let now = Instant::now();
            if now >= deadline {
                warn!("flight: channel {} never reached {}±{}", channel, value, tolerance);
                return Err(LinkError::Timeout.into());
            }
            let rc = self.link.receive_channel_input(timeout.min(deadline - now)).await?;
            let raw = rc.channel(channel).ok_or(FlightError::InvalidChannel(channel))?;
            if (low..=high).contains(&raw) {
                info!("flight: channel {} at {}", channel, raw);
                return Ok(raw);
            }
        }
    }

    /// Skip the active item.
    pub async fn jump_to_next_mission_item(&mut self) -> Result<u16, FlightError> {
        let current = self.link.await_current_mission_index().await?;
        let next = current.wrapping_add(1);
        self.link.set_current_mission_index(next).await?;
        Ok(next)
    }

    /// Recovery: upload the land mission again and resume AUTO.
    pub async fn resend_land_mission(&mut self) -> Result<(), FlightError> {
        if self.land.is_empty() {
            return Err(FlightError::LandNotLoaded);
        }
        self.land.send(&mut self.link).await?;
        self.link.set_mode("AUTO").await?;
        self.state = FlightState::Landing;
        Ok(())
    }
}
