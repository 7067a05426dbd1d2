//! Message builders shared by the unit tests.

use bytes::Bytes;
use contracts::{
    CameraDescriptor, Header, ImageMessage, StereoBundle, StreamMessage, Timestamp,
};

fn image(nanos: u64, frame: &str) -> ImageMessage {
    ImageMessage {
        header: Header::new(Timestamp::from_nanos(nanos), frame),
        width: 2,
        height: 1,
        encoding: "mono8".into(),
        is_bigendian: false,
        step: 2,
        data: Bytes::from_static(&[1, 2]),
    }
}

fn info(nanos: u64, frame: &str, tx: f64) -> CameraDescriptor {
    let p = [
        500.0, 0.0, 1.0, tx, //
        0.0, 500.0, 0.5, 0.0, //
        0.0, 0.0, 1.0, 0.0,
    ];
    CameraDescriptor::from_projection(Header::new(Timestamp::from_nanos(nanos), frame), 2, 1, &p)
}

pub(crate) fn left_image(nanos: u64) -> StreamMessage {
    StreamMessage::LeftImage(image(nanos, "left_optical"))
}

pub(crate) fn right_image(nanos: u64) -> StreamMessage {
    StreamMessage::RightImage(image(nanos, "right_optical"))
}

pub(crate) fn left_info(nanos: u64) -> StreamMessage {
    StreamMessage::LeftInfo(info(nanos, "left_optical", 0.0))
}

pub(crate) fn right_info(nanos: u64) -> StreamMessage {
    StreamMessage::RightInfo(info(nanos, "right_optical", -60.0))
}

/// All four streams at the same stamp, in slot order.
pub(crate) fn quad(nanos: u64) -> [StreamMessage; 4] {
    [
        left_image(nanos),
        right_image(nanos),
        left_info(nanos),
        right_info(nanos),
    ]
}

pub(crate) fn composite(nanos: u64) -> StreamMessage {
    StreamMessage::Composite(Box::new(StereoBundle {
        header: Header::new(Timestamp::from_nanos(nanos), "rig"),
        left_image: image(nanos, "left_optical"),
        right_image: image(nanos, "right_optical"),
        left_info: info(nanos, "left_optical", 0.0),
        right_info: info(nanos, "right_optical", -60.0),
    }))
}
