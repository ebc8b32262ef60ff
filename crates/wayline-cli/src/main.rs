use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use wayline_flight::{doctor as plan_doctor, AirdropPlan, Flight, FlightConfig, FlightState};
use wayline_geo::Coordinate;
use wayline_link::{ErrorCode, Link, LinkConfig, LinkError, MavTransport};
use wayline_mission::{LoadWindow, MissionStore, PlanType};
use wayline_proto::{JsonLinesSink, TelemetrySink};

#[derive(Debug, Parser)]
#[command(name = "wayline", version, about = "wayline - MAVLink mission upload & flight sequencing")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate config and every plan file without touching the vehicle.
    Doctor,
    /// Preflight, takeoff, fly the mission queue, land.
    Fly,
    Mission { #[command(subcommand)] cmd: MissionCmd },
    /// Stream position fixes (and log every message when [telemetry] is set) until ctrl-c.
    Telemetry,
}

#[derive(Debug, Subcommand)]
enum MissionCmd {
    /// Parse a plan file and print it in canonical form.
    Check { file: PathBuf, #[arg(long, value_enum, default_value = "waypoint")] plan: PlanArg },
    Upload { file: PathBuf, #[arg(long, value_enum, default_value = "waypoint")] plan: PlanArg },
    Clear { #[arg(long, value_enum, default_value = "waypoint")] plan: PlanArg },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PlanArg { Waypoint, Fence, Rally }

impl From<PlanArg> for PlanType {
    fn from(p: PlanArg) -> Self {
        match p {
            PlanArg::Waypoint => PlanType::Waypoint,
            PlanArg::Fence => PlanType::Geofence,
            PlanArg::Rally => PlanType::Rally,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    link: LinkConfig,
    #[serde(default)]
    flight: FlightConfig,
    plan: PlanCfg,

    airdrop: Option<AirdropCfg>,
    telemetry: Option<TelemetryCfg>,
}

#[derive(Debug, serde::Deserialize)]
struct PlanCfg {
    /// All zero means "current position".
    home: Point,
    geofence: PathBuf,
    takeoff: PathBuf,
    land: PathBuf,
    #[serde(default)]
    missions: Vec<PathBuf>,
    detect: Option<PathBuf>,
    max_radius_m: Option<f64>,
    /// Operator confirmation on an RC switch before takeoff.
    confirm: Option<ConfirmCfg>,
}

#[derive(Debug, serde::Deserialize)]
struct Point { lat: f64, lon: f64, #[serde(default)] alt: f64 }

impl Point {
    fn coordinate(&self) -> Coordinate {
        if self.lat == 0.0 && self.lon == 0.0 && self.alt == 0.0 {
            Coordinate::origin()
        } else {
            Coordinate::degrees(self.lat, self.lon, self.alt)
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ConfirmCfg {
    channel: u8,
    value: u16,
    tolerance: u16,
    receive_timeout_s: Option<u64>,
    window_s: u64,
}

#[derive(Debug, serde::Deserialize)]
struct AirdropCfg {
    file: PathBuf,
    insert_index: usize,
    target: Point,
    altitude_m: f64,
    #[serde(flatten)]
    plan: AirdropPlan,
}

#[derive(Debug, serde::Deserialize)]
struct TelemetryCfg { jsonl_path: String }

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Fly => fly(&cfg).await?,
        Command::Mission { cmd } => mission_cmd(&cfg, cmd).await?,
        Command::Telemetry => telemetry(&cfg).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    anyhow::ensure!(!cfg.link.url.is_empty(), "link.url missing");
    plan_doctor::check_flight_config(&cfg.flight)?;

    let home = cfg.plan.home.coordinate();
    if home.is_origin() {
        info!("doctor: home is the vehicle's position at preflight (OK)");
    } else {
        plan_doctor::check_home(&home)?;
    }

    let mut files: Vec<(&Path, PlanType)> = vec![
        (cfg.plan.geofence.as_path(), PlanType::Geofence),
        (cfg.plan.takeoff.as_path(), PlanType::Waypoint),
        (cfg.plan.land.as_path(), PlanType::Waypoint),
    ];
    files.extend(cfg.plan.missions.iter().map(|m| (m.as_path(), PlanType::Waypoint)));
    if let Some(d) = &cfg.plan.detect {
        files.push((d.as_path(), PlanType::Waypoint));
    }

    for (file, plan) in files {
        let store = load(file, plan)?;
        plan_doctor::check_plan(&store).with_context(|| format!("{}", file.display()))?;
        if let (Some(r), false) = (cfg.plan.max_radius_m, home.is_origin()) {
            if plan == PlanType::Waypoint {
                plan_doctor::check_radius(&store, &home, r).with_context(|| format!("{}", file.display()))?;
            }
        }
        info!("doctor: {} ok ({} {} items)", file.display(), store.len(), plan);
    }

    if let Some(a) = &cfg.airdrop {
        let target = a.target.coordinate();
        plan_doctor::check_home(&target).context("airdrop.target")?;
        let store = load(&a.file, PlanType::Waypoint)?;
        anyhow::ensure!(a.insert_index <= store.len(), "airdrop.insert_index past end of {}", a.file.display());
    }

    info!("doctor: OK");
    Ok(())
}

fn load(file: &Path, plan: PlanType) -> Result<MissionStore> {
    let mut store = MissionStore::new(plan);
    store
        .load_file(file, LoadWindow::all(), true)
        .map_err(|e| anyhow::anyhow!("{} [{}]", e, wayline_flight::decode_error(e.code())))
        .with_context(|| format!("load {}", file.display()))?;
    Ok(store)
}

async fn connect(cfg: &Config) -> Result<Link<MavTransport>> {
    let sink = match &cfg.telemetry {
        Some(t) => {
            let s = JsonLinesSink::create(&t.jsonl_path).with_context(|| format!("open {}", t.jsonl_path))?;
            info!("telemetry: logging to {}", t.jsonl_path);
            Some(Arc::new(s) as Arc<dyn TelemetrySink>)
        }
        None => None,
    };
    let transport = MavTransport::open(&cfg.link, sink).context("open link")?;
    let link = Link::connect(transport, cfg.link.request_timeout(), cfg.link.heartbeat_timeout())
        .await
        .context("wait for vehicle heartbeat")?;
    info!("link: vehicle {:?} at {:?}", link.vehicle(), link.target());
    Ok(link)
}

async fn mission_cmd(cfg: &Config, cmd: MissionCmd) -> Result<()> {
    match cmd {
        MissionCmd::Check { file, plan } => {
            let store = load(&file, plan.into())?;
            plan_doctor::check_plan(&store)?;
            print!("{}", store);
            Ok(())
        }
        MissionCmd::Upload { file, plan } => {
            let store = load(&file, plan.into())?.with_send_timeout(cfg.flight.mission_send_timeout());
            let mut link = connect(cfg).await?;
            store.send(&mut link).await.context("upload")?;
            println!("uploaded {} {} items", store.len(), store.plan());
            Ok(())
        }
        MissionCmd::Clear { plan } => {
            let mut link = connect(cfg).await?;
            MissionStore::new(plan.into()).clear(&mut link).await.context("clear")?;
            println!("cleared {} plan", PlanType::from(plan));
            Ok(())
        }
    }
}

async fn fly(cfg: &Config) -> Result<()> {
    info!("fly: starting");
    let link = connect(cfg).await?;
    let mut flight = Flight::new(link, cfg.flight.clone());

    flight
        .preflight_check(&cfg.plan.land, &cfg.plan.geofence, &cfg.plan.home.coordinate())
        .await
        .context("preflight")?;

    if let Some(c) = &cfg.plan.confirm {
        info!("fly: waiting for channel {} at {}", c.channel, c.value);
        let receive = Duration::from_secs(c.receive_timeout_s.unwrap_or(2));
        flight
            .wait_for_channel_input(c.channel, c.value, c.tolerance, receive, Duration::from_secs(c.window_s))
            .await
            .context("operator confirmation")?;
    }

    for m in &cfg.plan.missions {
        flight.append_mission(m).with_context(|| format!("queue {}", m.display()))?;
    }
    if let Some(d) = &cfg.plan.detect {
        flight.append_detect_mission(Some(d.as_path())).context("queue detect mission")?;
    }
    if let Some(a) = &cfg.airdrop {
        flight
            .build_airdrop_mission(&a.target.coordinate(), &a.file, a.insert_index, a.altitude_m, &a.plan)
            .context("build airdrop mission")?;
        flight.append_airdrop_mission()?;
    }
    flight.append_land_mission()?;

    flight.takeoff(&cfg.plan.takeoff).await.context("takeoff")?;

    while flight.state() != FlightState::Landing {
        if let Err(e) = flight.wait_and_send_next_mission().await {
            error!("fly: hand-off failed: {}", wayline_flight::decode_error(e.code()));
            warn!("fly: falling back to the land mission");
            tokio::time::sleep(cfg.flight.landing_retry_delay()).await;
            flight.resend_land_mission().await.context("resend land mission")?;
            break;
        }
    }

    flight.land().await.context("landing")?;
    info!("fly: landed");
    Ok(())
}

async fn telemetry(cfg: &Config) -> Result<()> {
    let mut link = connect(cfg).await?;
    let timeout = cfg.link.request_timeout();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("telemetry: stopped");
                return Ok(());
            }
            fix = link.receive_gps(timeout) => match fix {
                Ok(f) => println!(
                    "{} rel_alt={:.1}m hdg={:?} vel_ned={:?}",
                    f.position, f.relative_alt_m, f.heading_deg, f.velocity_ned
                ),
                Err(LinkError::Timeout) => warn!("telemetry: no position for {:?}", timeout),
                Err(e) => return Err(anyhow::Error::from(e).context("telemetry")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_config_parses() {
        let cfg: Config = toml::from_str(include_str!("../../../demos/wayline.toml")).unwrap();
        assert!(cfg.plan.home.coordinate().is_origin());
        assert_eq!(cfg.flight.waypoint_timeout(), Duration::from_secs(300));
        assert_eq!(cfg.link.request_timeout(), Duration::from_millis(5000));

        let airdrop = cfg.airdrop.unwrap();
        assert_eq!(airdrop.plan.item_count(), 4);
        assert_eq!(airdrop.plan.release.map(|r| r.pwm), Some(1900));
    }
}
