//! Partially filled correlated tuple.

use contracts::{CameraDescriptor, CorrelatedTuple, ImageMessage, StreamMessage};

/// One slot per stream; complete once all four are filled.
#[derive(Debug, Default)]
pub(crate) struct TupleBuilder {
    left_image: Option<ImageMessage>,
    right_image: Option<ImageMessage>,
    left_info: Option<CameraDescriptor>,
    right_info: Option<CameraDescriptor>,
}

impl TupleBuilder {
    /// Store a message in its slot. Returns `true` if it replaced one.
    /// Composite messages are ignored.
    pub(crate) fn insert(&mut self, message: StreamMessage) -> bool {
        match message {
            StreamMessage::LeftImage(m) => self.left_image.replace(m).is_some(),
            StreamMessage::RightImage(m) => self.right_image.replace(m).is_some(),
            StreamMessage::LeftInfo(c) => self.left_info.replace(c).is_some(),
            StreamMessage::RightInfo(c) => self.right_info.replace(c).is_some(),
            StreamMessage::Composite(_) => false,
        }
    }

    pub(crate) fn filled(&self) -> usize {
        usize::from(self.left_image.is_some())
            + usize::from(self.right_image.is_some())
            + usize::from(self.left_info.is_some())
            + usize::from(self.right_info.is_some())
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.filled() == 4
    }

    pub(crate) fn build(self) -> Option<CorrelatedTuple> {
        Some(CorrelatedTuple::new(
            self.left_image?,
            self.right_image?,
            self.left_info?,
            self.right_info?,
        ))
    }
}
