//! Display rotation.

use serde::{Deserialize, Serialize};

use crate::model::FieldError;

/// Display orientation in 90° steps, persisted as its index `0..=3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum ScreenRotation {
    #[default]
    Deg0 = 0,
    Deg90 = 1,
    Deg180 = 2,
    Deg270 = 3,
}

impl ScreenRotation {
    pub const ALL: [ScreenRotation; 4] = [
        ScreenRotation::Deg0,
        ScreenRotation::Deg90,
        ScreenRotation::Deg180,
        ScreenRotation::Deg270,
    ];

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn degrees(self) -> u16 {
        self.index() as u16 * 90
    }

    pub fn from_degrees(degrees: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.degrees() == degrees)
    }

    /// The next orientation clockwise, wrapping at 270°.
    pub fn rotated_cw(self) -> Self {
        Self::ALL[(self.index() as usize + 1) % Self::ALL.len()]
    }
}

impl TryFrom<i32> for ScreenRotation {
    type Error = FieldError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(FieldError::OutOfRange {
                field: "rotation",
                value: value.into(),
            })
    }
}

impl TryFrom<u8> for ScreenRotation {
    type Error = FieldError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from(i32::from(value))
    }
}

impl From<ScreenRotation> for i32 {
    fn from(value: ScreenRotation) -> Self {
        value.index().into()
    }
}

/// Display configuration persisted next to the settings record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConfig {
    pub rotation: ScreenRotation,
}
