use mavlink::common::{MavCmd, MavMessage, MavMissionResult, MavMissionType};
use std::time::Duration;
use tokio::time::Instant;
use wayline_geo::Coordinate;
use wayline_link::mock::MockVehicle;
use wayline_link::{ErrorCode, Link, LinkError};
use wayline_mission::{MissionError, MissionItem, MissionStore, PlanType, DEFAULT_SEND_TIMEOUT};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect(vehicle: MockVehicle) -> Link<MockVehicle> {
    Link::connect(vehicle, REQUEST_TIMEOUT, REQUEST_TIMEOUT).await.unwrap()
}

fn store(plan: PlanType, n: u16) -> MissionStore {
    let home = Coordinate::degrees(38.1446916, -76.4279956, 30.0);
    let mut s = MissionStore::new(plan);
    for seq in 0..n {
        s.push(MissionItem::waypoint(seq, &home.offset(100.0 * seq as f64, 45.0), plan));
    }
    s
}

fn items_sent(link: &Link<MockVehicle>) -> Vec<u16> {
    link.transport().items_sent().iter().map(|i| i.seq).collect()
}

#[tokio::test(start_paused = true)]
async fn duplicate_request_is_answered_again() {
    let mut vehicle = MockVehicle::plane();
    vehicle.request_order(vec![0, 1, 1, 2]);
    let mut link = connect(vehicle).await;

    store(PlanType::Waypoint, 3).send(&mut link).await.unwrap();
    assert_eq!(items_sent(&link), vec![0, 1, 1, 2]);

    let cmds: Vec<MavCmd> = link.transport().commands().iter().map(|c| c.command).collect();
    assert_eq!(cmds, vec![MavCmd::MAV_CMD_DO_SET_MODE, MavCmd::MAV_CMD_MISSION_START]);
    let start = &link.transport().commands()[1];
    assert_eq!((start.param1, start.param2), (0.0, 2.0));
}

#[tokio::test(start_paused = true)]
async fn out_of_order_requests_get_the_requested_item() {
    let mut vehicle = MockVehicle::plane();
    vehicle.request_order(vec![1, 0, 2]);
    let mut link = connect(vehicle).await;

    store(PlanType::Waypoint, 3).send(&mut link).await.unwrap();
    assert_eq!(items_sent(&link), vec![1, 0, 2]);
}

#[tokio::test(start_paused = true)]
async fn stalled_vehicle_times_out_within_budget() {
    let mut vehicle = MockVehicle::plane();
    vehicle.request_order(vec![0]);
    vehicle.mission_ack(None);
    let mut link = connect(vehicle).await;

    let started = Instant::now();
    let err = store(PlanType::Waypoint, 3).send(&mut link).await.unwrap_err();
    assert_eq!(err, MissionError::Link(LinkError::Timeout));
    assert_eq!(err.code(), 101);
    assert!(started.elapsed() <= DEFAULT_SEND_TIMEOUT);
    assert_eq!(items_sent(&link), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn shorter_budget_is_honoured() {
    let mut vehicle = MockVehicle::plane();
    vehicle.request_order(vec![]);
    let mut link = connect(vehicle).await;

    let budget = Duration::from_secs(7);
    let started = Instant::now();
    let err = store(PlanType::Waypoint, 2)
        .with_send_timeout(budget)
        .send(&mut link)
        .await
        .unwrap_err();
    assert_eq!(err.code(), 101);
    assert!(started.elapsed() <= budget);
}

#[tokio::test(start_paused = true)]
async fn rejected_plan_is_not_a_timeout() {
    let mut vehicle = MockVehicle::plane();
    vehicle.mission_ack(Some(MavMissionResult::MAV_MISSION_NO_SPACE));
    let mut link = connect(vehicle).await;

    let err = store(PlanType::Waypoint, 2).send(&mut link).await.unwrap_err();
    assert_eq!(err, MissionError::Link(LinkError::MissionRejected(MavMissionResult::MAV_MISSION_NO_SPACE)));
    assert_eq!(err.code(), 103);
    assert!(link.transport().commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn request_outside_the_plan_is_reported() {
    let mut vehicle = MockVehicle::plane();
    vehicle.request_order(vec![0, 9]);
    let mut link = connect(vehicle).await;

    let err = store(PlanType::Waypoint, 2).send(&mut link).await.unwrap_err();
    assert_eq!(err, MissionError::UnknownSequence(9));
    assert_eq!(err.code(), 206);
}

#[tokio::test(start_paused = true)]
async fn fence_upload_does_not_start_anything() {
    let mut link = connect(MockVehicle::plane()).await;

    store(PlanType::Geofence, 4).send(&mut link).await.unwrap();
    assert!(link.transport().commands().is_empty());

    let count = link.transport().sent().into_iter().find_map(|m| match m {
        MavMessage::MISSION_COUNT(c) => Some(c.clone()),
        _ => None,
    });
    let count = count.unwrap();
    assert_eq!(count.count, 4);
    assert_eq!(count.mission_type, MavMissionType::MAV_MISSION_TYPE_FENCE);
    assert!(link
        .transport()
        .items_sent()
        .iter()
        .all(|i| i.mission_type == MavMissionType::MAV_MISSION_TYPE_FENCE));
}

#[tokio::test(start_paused = true)]
async fn empty_plan_only_waits_for_the_ack() {
    let mut link = connect(MockVehicle::plane()).await;
    MissionStore::new(PlanType::Rally).send(&mut link).await.unwrap();
    assert!(items_sent(&link).is_empty());
}

#[tokio::test(start_paused = true)]
async fn clear_uses_ack_semantics() {
    let mut vehicle = MockVehicle::plane();
    vehicle.clear_ack(Some(MavMissionResult::MAV_MISSION_ERROR));
    let mut link = connect(vehicle).await;
    let err = store(PlanType::Waypoint, 1).clear(&mut link).await.unwrap_err();
    assert_eq!(err.code(), 103);

    let mut vehicle = MockVehicle::plane();
    vehicle.clear_ack(None);
    let mut link = connect(vehicle).await;
    let err = store(PlanType::Waypoint, 1).clear(&mut link).await.unwrap_err();
    assert_eq!(err, MissionError::Link(LinkError::Timeout));
}

#[tokio::test(start_paused = true)]
async fn clear_names_the_plan_type() {
    let mut link = connect(MockVehicle::plane()).await;
    MissionStore::new(PlanType::Rally).clear(&mut link).await.unwrap();

    let clear = link.transport().sent().into_iter().find_map(|m| match m {
        MavMessage::MISSION_CLEAR_ALL(c) => Some(c.mission_type),
        _ => None,
    });
    assert_eq!(clear, Some(MavMissionType::MAV_MISSION_TYPE_RALLY));
}

#[tokio::test(start_paused = true)]
async fn oversized_plan_is_refused_before_announcing() {
    let mut link = connect(MockVehicle::plane()).await;
    let wp = MissionItem::waypoint(0, &Coordinate::degrees(38.1446916, -76.4279956, 30.0), PlanType::Waypoint);
    let mut big = MissionStore::new(PlanType::Waypoint);
    for seq in 0..=u16::MAX as usize {
        big.push(MissionItem { seq: seq as u16, ..wp.clone() });
    }

    let err = big.send(&mut link).await.unwrap_err();
    assert_eq!(err, MissionError::TooManyItems(65_536));
    assert_eq!(err.code(), 208);
    assert!(link.transport().sent().is_empty());
}
