use std::path::Path;
use std::sync::Arc;

use pinctl::{
    BOUND_HIGH, BOUND_LOW, Direction, Edge, Gpio, GpioError, InvalidId, Level, LineState,
    MockSysfs, SysfsBackend, validate_direction, validate_edge,
};

fn mock_gpio() -> (Arc<MockSysfs>, Gpio) {
    let mock = Arc::new(MockSysfs::default());
    let gpio = Gpio::with_defaults(mock.clone()).expect("mock gpio");
    (mock, gpio)
}

#[test]
fn every_id_in_bound_is_accepted() {
    let (mock, gpio) = mock_gpio();
    for id in BOUND_LOW..=BOUND_HIGH {
        let line = gpio.line(id).expect("id in bound");
        assert_eq!(line.id(), id);
    }
    assert!(mock.writes().is_empty());
}

#[test]
fn ids_just_outside_bound_are_rejected() {
    let (mock, gpio) = mock_gpio();

    let err = gpio.line(1).unwrap_err();
    assert_eq!(err.to_string(), "Out of range (2-27): 1");
    assert!(matches!(
        err,
        GpioError::InvalidId(InvalidId::OutOfRange {
            low: 2,
            high: 27,
            value: 1
        })
    ));

    let err = gpio.line(28).unwrap_err();
    assert_eq!(err.to_string(), "Out of range (2-27): 28");

    let err = gpio.line(-3).unwrap_err();
    assert_eq!(err.to_string(), "Out of range (2-27): -3");

    assert!(mock.writes().is_empty());
}

#[test]
fn empty_and_non_integer_ids_are_rejected_before_file_access() {
    let (mock, gpio) = mock_gpio();

    let err = gpio.line(0).unwrap_err();
    assert!(matches!(err, GpioError::InvalidId(InvalidId::Empty)));
    assert_eq!(err.to_string(), "Empty gpio id");

    assert!(matches!(
        gpio.parse_line("").unwrap_err(),
        GpioError::InvalidId(InvalidId::Empty)
    ));
    assert!(matches!(
        gpio.parse_line("1.4").unwrap_err(),
        GpioError::InvalidId(InvalidId::NotInteger(_))
    ));
    assert!(matches!(
        gpio.parse_line("abc").unwrap_err(),
        GpioError::InvalidId(InvalidId::NotInteger(_))
    ));
    assert_eq!(gpio.parse_line(" 17 ").expect("valid text id").id(), 17);

    assert!(mock.writes().is_empty());
}

#[test]
fn symbols_are_validated_against_their_sets() {
    assert_eq!(validate_direction("in").unwrap(), Direction::In);
    assert_eq!(validate_direction("out").unwrap(), Direction::Out);
    assert_eq!(
        validate_direction("toto").unwrap_err().to_string(),
        "Wrong direction (in/out): toto"
    );

    for (text, edge) in [
        ("none", Edge::None),
        ("rising", Edge::Rising),
        ("falling", Edge::Falling),
        ("both", Edge::Both),
    ] {
        assert_eq!(validate_edge(text).unwrap(), edge);
        assert_eq!(edge.as_str(), text);
    }
    assert_eq!(
        validate_edge("toto").unwrap_err().to_string(),
        "Wrong edge (none/rising/falling/both): toto"
    );
}

#[test]
fn level_codec() {
    assert_eq!(Level::decode("1\n"), Level::High);
    assert_eq!(Level::decode(" 0 "), Level::Low);
    assert_eq!(Level::decode(""), Level::Low);
    assert_eq!(Level::decode("\n"), Level::Low);

    assert_eq!(Level::from(true), Level::High);
    assert_eq!(Level::from(1u8), Level::High);
    assert_eq!(Level::from(7u8), Level::Low);
    assert_eq!(Level::coerce("1"), Level::High);
    assert_eq!(Level::coerce("high"), Level::Low);

    assert_eq!("1".parse::<Level>().unwrap(), Level::High);
    let err = "2".parse::<Level>().unwrap_err();
    assert!(matches!(err, GpioError::InvalidValue(_)));
    assert_eq!(err.to_string(), "Wrong value (1/0): 2");
}

#[test]
fn claim_and_release_toggle_claim_state() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(8).unwrap();

    assert!(!line.is_claimed());
    line.claim().unwrap();
    assert!(line.is_claimed());
    assert_eq!(mock.attr(8, "direction").as_deref(), Some("in"));
    assert!(gpio.registry().get(8).is_some());

    line.release().unwrap();
    assert!(!line.is_claimed());
    assert!(gpio.registry().get(8).is_none());
    assert_eq!(mock.attr(8, "value"), None);
}

#[test]
fn release_without_claim_is_not_claimed() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(6).unwrap();

    let err = line.release().unwrap_err();
    assert!(matches!(err, GpioError::NotClaimed(6)));
    assert_eq!(err.to_string(), "Not exported: 6");
    assert!(mock.writes().is_empty());
}

#[test]
fn io_failures_surface_without_retry() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(9).unwrap();

    line.claim().unwrap();
    let err = line.claim().unwrap_err();
    assert!(matches!(err, GpioError::Io { .. }));
    assert_eq!(mock.writes().len(), 1);
}

#[test]
fn write_then_read_round_trips() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(4).unwrap();

    line.setup("out", "none").unwrap();
    line.write(1u8).unwrap();
    assert!(line.read().unwrap());
    assert_eq!(mock.attr(4, "value").as_deref(), Some("1"));

    line.write(false).unwrap();
    assert!(!line.read().unwrap());

    line.write(Level::coerce("1")).unwrap();
    assert!(line.read().unwrap());

    line.write(Level::coerce("yes")).unwrap();
    assert!(!line.read().unwrap());
}

#[test]
fn operations_on_unclaimed_line_fail_without_writes() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(11).unwrap();

    assert!(matches!(line.write(true), Err(GpioError::NotClaimed(11))));
    assert!(matches!(line.read(), Err(GpioError::NotClaimed(11))));
    assert!(matches!(
        line.set_direction(Direction::Out),
        Err(GpioError::NotClaimed(11))
    ));
    assert!(matches!(
        line.set_edge(Edge::Rising),
        Err(GpioError::NotClaimed(11))
    ));
    assert!(mock.writes().is_empty());
}

#[test]
fn invalid_direction_leaves_configuration_unchanged() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(12).unwrap();
    line.setup(Direction::Out, Edge::None).unwrap();
    let writes = mock.writes().len();

    let err = line.set_direction("toto").unwrap_err();
    assert!(matches!(err, GpioError::InvalidDirection(ref d) if d == "toto"));
    assert!(err.is_validation());
    assert_eq!(line.direction(), Some(Direction::Out));
    assert_eq!(mock.attr(12, "direction").as_deref(), Some("out"));
    assert_eq!(mock.writes().len(), writes);
}

#[test]
fn invalid_edge_leaves_configuration_unchanged() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(7).unwrap();
    line.setup(Direction::In, Edge::Rising).unwrap();
    let writes = mock.writes().len();

    let err = line.set_edge("toto").unwrap_err();
    assert!(matches!(err, GpioError::InvalidEdge(ref e) if e == "toto"));
    assert_eq!(line.edge(), Some(Edge::Rising));
    assert_eq!(mock.attr(7, "edge").as_deref(), Some("rising"));
    assert_eq!(mock.writes().len(), writes);
}

#[test]
fn invalid_setup_does_not_claim() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(13).unwrap();

    assert!(matches!(
        line.setup("out", "sideways"),
        Err(GpioError::InvalidEdge(_))
    ));
    assert!(matches!(
        gpio.setup_line(13, "up", Edge::None),
        Err(GpioError::InvalidDirection(_))
    ));
    assert!(!line.is_claimed());
    assert!(mock.writes().is_empty());
}

#[test]
fn setup_is_idempotent() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(10).unwrap();

    line.setup(Direction::In, Edge::Falling).unwrap();
    let after_first = mock.writes();
    assert_eq!(after_first.len(), 3);
    assert_eq!(mock.attr(10, "direction").as_deref(), Some("in"));
    assert_eq!(mock.attr(10, "edge").as_deref(), Some("falling"));

    line.setup(Direction::In, Edge::Falling).unwrap();
    assert_eq!(mock.writes(), after_first);
    assert_eq!(mock.attr(10, "direction").as_deref(), Some("in"));
    assert_eq!(mock.attr(10, "edge").as_deref(), Some("falling"));

    line.setup(Direction::In, Edge::Both).unwrap();
    assert_eq!(mock.attr(10, "edge").as_deref(), Some("both"));
    assert_eq!(mock.writes().len(), 5);
}

#[test]
fn reclaim_after_external_unexport_reapplies_setup() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(5).unwrap();
    line.setup(Direction::Out, Edge::None).unwrap();

    // unexported behind this process's back; the next export comes up as `in`
    mock.write(Path::new("/sys/class/gpio/unexport"), "5").unwrap();
    line.claim().unwrap();
    assert_eq!(line.direction(), None);
    assert_eq!(line.state(), LineState::Claimed);

    line.setup(Direction::Out, Edge::None).unwrap();
    assert_eq!(mock.attr(5, "direction").as_deref(), Some("out"));
    line.write(true).unwrap();
    assert!(line.read().unwrap());
}

#[test]
fn up_and_down_claim_as_output() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(17).unwrap();

    line.up().unwrap();
    assert!(line.is_claimed());
    assert_eq!(line.direction(), Some(Direction::Out));
    assert_eq!(mock.attr(17, "value").as_deref(), Some("1"));

    line.down().unwrap();
    assert_eq!(mock.attr(17, "value").as_deref(), Some("0"));
}

#[test]
fn up_turns_a_known_input_around() {
    let (mock, gpio) = mock_gpio();
    let line = gpio.line(22).unwrap();
    line.setup(Direction::In, Edge::None).unwrap();

    assert!(matches!(line.write(true), Err(GpioError::NotOutput(22))));

    line.up().unwrap();
    assert_eq!(mock.attr(22, "direction").as_deref(), Some("out"));
    assert!(line.read().unwrap());
}

#[test]
fn lifecycle_states() {
    let (_mock, gpio) = mock_gpio();
    let line = gpio.line(26).unwrap();
    assert_eq!(line.state(), LineState::Unclaimed);

    line.claim().unwrap();
    assert_eq!(line.state(), LineState::Claimed);

    line.set_direction(Direction::In).unwrap();
    assert_eq!(line.state(), LineState::Configured);

    let mut watcher = line.listen(|_| {}).unwrap();
    assert_eq!(line.state(), LineState::Active);

    watcher.detach().unwrap();
    assert_eq!(line.state(), LineState::Configured);

    line.release().unwrap();
    assert_eq!(line.state(), LineState::Unclaimed);
}

#[test]
fn batch_setup_reports_each_line() {
    let (_mock, gpio) = mock_gpio();

    let results = gpio.setup_lines(&[4, 30, 5], Direction::Out, Edge::None);
    assert_eq!(results.len(), 3);
    assert!(results[0].1.is_ok());
    assert!(matches!(
        results[1].1,
        Err(GpioError::InvalidId(InvalidId::OutOfRange { value: 30, .. }))
    ));
    assert!(results[2].1.is_ok());

    assert!(gpio.line(4).unwrap().is_claimed());
    assert!(gpio.line(5).unwrap().is_claimed());
    assert_eq!(gpio.registry().ids(), vec![4, 5]);
}

#[test]
fn release_all_releases_recorded_lines() {
    let (mock, gpio) = mock_gpio();
    gpio.line(4).unwrap().up().unwrap();
    gpio.line(5).unwrap().up().unwrap();

    let released = gpio.release_all();
    assert_eq!(released.len(), 2);
    assert!(released.iter().all(|(_, r)| r.is_ok()));
    assert!(gpio.registry().ids().is_empty());
    assert_eq!(mock.attr(4, "value"), None);
    assert_eq!(mock.attr(5, "value"), None);
}

#[test]
fn separate_factories_do_not_share_registries() {
    let mock = Arc::new(MockSysfs::default());
    let first = Gpio::with_defaults(mock.clone()).unwrap();
    let second = Gpio::with_defaults(mock.clone()).unwrap();

    first.line(4).unwrap().up().unwrap();
    assert_eq!(first.registry().ids(), vec![4]);
    assert!(second.registry().ids().is_empty());
    assert!(second.line(4).unwrap().is_claimed());
}
