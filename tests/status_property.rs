mod common;

use common::{FakeDisplay, ATOMS};
use xlockd::status::{decode, StatusMode, StatusPublisher};

#[test]
fn publish_preserves_renderer_slots() {
    let mut display = FakeDisplay {
        property: vec![0, 10, 7, 9],
        ..Default::default()
    };
    let mut publisher = StatusPublisher::new(ATOMS);

    publisher.publish(&mut display, StatusMode::Blanked, 1_234);
    assert_eq!(display.property, vec![ATOMS.blank, 1_234, 7, 9]);
    assert_eq!(publisher.last(), Some((StatusMode::Blanked, 1_234)));
}

#[test]
fn publishing_twice_is_idempotent() {
    let mut display = FakeDisplay::default();
    let mut publisher = StatusPublisher::new(ATOMS);

    publisher.publish(&mut display, StatusMode::Locked, 99);
    let first = display.property.clone();
    publisher.publish(&mut display, StatusMode::Locked, 99);

    assert_eq!(display.property, first);
    assert_eq!(display.writes, 1);

    let status = decode(&ATOMS, &display.property).unwrap();
    assert_eq!((status.mode, status.since), (StatusMode::Locked, 99));
}
