use parkbay_core::{
    Action, Activity, BayView, ChangeMode, Command, Event, Lifecycle, Motion, Occupancy, Trigger,
};
use rstest::{fixture, rstest};

const BAY_TOPIC: &str = "parkbay/bay1/cmd";
const SYS_TOPIC: &str = "parkbay/cmd";
const DOOR: &str = "garage/door";

fn msg<'a>(topic: &'a str, payload: &'a str) -> Event<'a> {
    Event::Message { topic, payload }
}

fn ready_view() -> BayView {
    BayView {
        lifecycle: Lifecycle::Ready,
        ..BayView::new("bay1")
    }
}

#[fixture]
fn view() -> BayView {
    ready_view()
}

fn with_activity(activity: Activity) -> BayView {
    BayView {
        activity,
        ..ready_view()
    }
}

#[rstest]
#[case::dock_idle(Activity::Idle, "dock", true)]
#[case::dock_while_docking(Activity::Docking, "dock", false)]
#[case::undock_while_undocking(Activity::Undocking, "undock", false)]
#[case::verify_while_docking(Activity::Docking, "verify", false)]
#[case::verify_while_verifying(Activity::Verifying, "verify", true)]
#[case::abort_while_docking(Activity::Docking, "abort", true)]
#[case::abort_idle(Activity::Idle, "ABORT", true)]
fn bay_command_filtering(#[case] activity: Activity, #[case] payload: &str, #[case] queued: bool) {
    let mut t = Trigger::bay_command("bay_cmd", BAY_TOPIC);
    let n = t.observe(&msg(BAY_TOPIC, payload), &with_activity(activity));
    assert_eq!(n == 1, queued);
    assert_eq!(t.triggered(), queued);
}

#[rstest]
fn bay_command_refuses_motion_when_unavailable(view: BayView) {
    let mut t = Trigger::bay_command("bay_cmd", BAY_TOPIC);
    let down = BayView {
        lifecycle: Lifecycle::Unavailable,
        ..view
    };
    assert_eq!(t.observe(&msg(BAY_TOPIC, "dock"), &down), 0);
    assert_eq!(t.observe(&msg(BAY_TOPIC, "abort"), &down), 1);
    assert_eq!(t.drain(), vec![Command::Abort]);
}

#[rstest]
fn bay_command_discards_unknown_and_system_commands(view: BayView) {
    let mut t = Trigger::bay_command("bay_cmd", BAY_TOPIC);
    assert_eq!(t.observe(&msg(BAY_TOPIC, "park"), &view), 0);
    assert_eq!(t.observe(&msg(BAY_TOPIC, "reboot"), &view), 0);
    assert!(!t.triggered());
}

#[rstest]
#[case("reboot", Some(Command::Reboot))]
#[case("ReScan", Some(Command::Rescan))]
#[case("rediscover", Some(Command::Rediscover))]
#[case("dock", None)]
#[case("shutdown", None)]
fn system_command_accepts_only_system_tokens(
    view: BayView,
    #[case] payload: &str,
    #[case] expected: Option<Command>,
) {
    let mut t = Trigger::system_command("sys", SYS_TOPIC);
    t.observe(&msg(SYS_TOPIC, payload), &view);
    assert_eq!(t.drain(), expected.into_iter().collect::<Vec<_>>());
}

#[rstest]
fn from_mode_fires_only_on_transition_away(view: BayView) {
    let mut t = Trigger::mqtt_sensor(
        "door",
        DOOR,
        ChangeMode::From("closed".into()),
        Action::Command(Command::Dock),
    );
    assert_eq!(t.observe(&msg(DOOR, "closed"), &view), 0);
    assert_eq!(
        t.watch_state().previous_value.as_deref(),
        Some("closed")
    );
    assert_eq!(t.observe(&msg(DOOR, "open"), &view), 1);
    // Still away from "closed": no new transition.
    assert_eq!(t.observe(&msg(DOOR, "open"), &view), 0);
    assert_eq!(t.observe(&msg(DOOR, "Closed"), &view), 0);
    assert_eq!(t.observe(&msg(DOOR, "ajar"), &view), 1);
    assert_eq!(t.drain(), vec![Command::Dock, Command::Dock]);
}

#[rstest]
fn from_mode_never_fires_on_first_value(view: BayView) {
    let mut t = Trigger::mqtt_sensor(
        "door",
        DOOR,
        ChangeMode::From("closed".into()),
        Action::Command(Command::Dock),
    );
    assert_eq!(t.observe(&msg(DOOR, "open"), &view), 0);
}

#[rstest]
fn to_mode_fires_every_match(view: BayView) {
    let mut t = Trigger::mqtt_sensor(
        "door",
        DOOR,
        ChangeMode::To("Open".into()),
        Action::Command(Command::Verify),
    );
    assert_eq!(t.observe(&msg(DOOR, "open"), &view), 1);
    assert_eq!(t.observe(&msg(DOOR, "OPEN"), &view), 1);
    assert_eq!(t.observe(&msg(DOOR, "closed"), &view), 0);
    assert_eq!(t.drain(), vec![Command::Verify, Command::Verify]);
}

#[rstest]
#[case(Occupancy::Occupied, vec![Command::Undock])]
#[case(Occupancy::Unoccupied, vec![Command::Dock])]
#[case(Occupancy::Unknown, vec![])]
fn occupancy_action_depends_on_bay(
    view: BayView,
    #[case] occupancy: Occupancy,
    #[case] expected: Vec<Command>,
) {
    let mut t = Trigger::mqtt_sensor("door", DOOR, ChangeMode::To("open".into()), Action::Occupancy);
    let v = BayView { occupancy, ..view };
    t.observe(&msg(DOOR, "open"), &v);
    assert_eq!(t.drain(), expected);
}

#[rstest]
#[case(Motion::Approaching, 1)]
#[case(Motion::Receding, 1)]
#[case(Motion::Still, 0)]
#[case(Motion::Unknown, 0)]
fn range_trigger_fires_on_motion(view: BayView, #[case] motion: Motion, #[case] fired: usize) {
    let mut t = Trigger::range("range_motion", Action::Occupancy);
    let v = BayView {
        motion,
        occupancy: Occupancy::Unoccupied,
        ..view
    };
    assert_eq!(t.observe(&Event::BayChanged, &v), fired);
    // Range triggers ignore messages.
    assert_eq!(t.observe(&msg(DOOR, "open"), &v), 0);
}

#[rstest]
fn drain_round_trip(view: BayView) {
    let mut t = Trigger::bay_command("bay_cmd", BAY_TOPIC);
    for p in ["dock", "abort", "verify"] {
        t.observe(&msg(BAY_TOPIC, p), &view);
    }
    assert!(t.triggered());
    assert!(t.triggered(), "triggered() must not consume");
    assert_eq!(
        t.drain(),
        vec![Command::Dock, Command::Abort, Command::Verify]
    );
    assert!(!t.triggered());
    assert!(t.drain().is_empty());
}
