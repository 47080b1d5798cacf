use std::fmt;
use std::io;

use crate::boxes::BoxId;
use crate::data::ObjectHandle;
use crate::text::{FontId, WsId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    InvalidConstraint { width: i32, max: i32 },
    UnknownBox(BoxId),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::InvalidConstraint { width, max } => {
                write!(f, "invalid layout width {} (allowed 0..={})", width, max)
            }
            LayoutError::UnknownBox(id) => write!(f, "unknown box {:?}", id),
        }
    }
}

impl std::error::Error for LayoutError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    Unsupported { font: FontId, ws: WsId },
    HardBreakInRun { offset: usize },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::Unsupported { font, ws } => {
                write!(f, "no segment engine for font {} / ws {}", font.0, ws.0)
            }
            ShapeError::HardBreakInRun { offset } => {
                write!(f, "run contains a hard line break at byte {}", offset)
            }
        }
    }
}

impl std::error::Error for ShapeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    Unbalanced { expected: &'static str, found: &'static str },
    InvalidChild { container: &'static str, child: &'static str },
    DepthExceeded { object: ObjectHandle, depth: usize },
    UnknownBox(BoxId),
    NotLazy(BoxId),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Unbalanced { expected, found } => {
                write!(f, "unbalanced view: expected to close {}, found {}", expected, found)
            }
            BuildError::InvalidChild { container, child } => {
                write!(f, "{} cannot contain {}", container, child)
            }
            BuildError::DepthExceeded { object, depth } => {
                write!(f, "display of object {} exceeded depth {}", object.0, depth)
            }
            BuildError::UnknownBox(id) => write!(f, "unknown box {:?}", id),
            BuildError::NotLazy(id) => write!(f, "box {:?} is not a lazy box", id),
        }
    }
}

impl std::error::Error for BuildError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    DeadBox { box_id: BoxId },
    RangeOutOfBounds { parent: BoxId, start: usize, len: usize, children: usize },
    EmptyRange { object: ObjectHandle },
    StaleBoxEntry { box_id: BoxId },
    MissingBoxEntry { box_id: BoxId },
    OccurrenceOrder { object: ObjectHandle },
    Unreachable { box_id: BoxId },
    ParentMismatch { object: ObjectHandle },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::DeadBox { box_id } => write!(f, "notifier refers to dead box {:?}", box_id),
            IndexError::RangeOutOfBounds {
                parent,
                start,
                len,
                children,
            } => write!(
                f,
                "range {}+{} exceeds {} children of {:?}",
                start, len, children, parent
            ),
            IndexError::EmptyRange { object } => {
                write!(f, "empty notifier range for object {}", object.0)
            }
            IndexError::StaleBoxEntry { box_id } => {
                write!(f, "box {:?} indexed outside its notifier ranges", box_id)
            }
            IndexError::MissingBoxEntry { box_id } => {
                write!(f, "box {:?} missing from the box index", box_id)
            }
            IndexError::OccurrenceOrder { object } => {
                write!(f, "occurrences of object {} out of document order", object.0)
            }
            IndexError::Unreachable { box_id } => {
                write!(f, "box {:?} is not reachable from the root", box_id)
            }
            IndexError::ParentMismatch { object } => {
                write!(f, "notifier for object {} lies outside its parent range", object.0)
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// Why a build path no longer matches the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    Empty,
    NotRoot { object: ObjectHandle },
    MissingObject { object: ObjectHandle },
    Moved { object: ObjectHandle, index: usize },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "empty build path"),
            PathError::NotRoot { object } => {
                write!(f, "build path starts at {} instead of the display root", object)
            }
            PathError::MissingObject { object } => write!(f, "object {} no longer exists", object),
            PathError::Moved { object, index } => {
                write!(f, "object {} is no longer at index {} of its parent", object, index)
            }
        }
    }
}

impl std::error::Error for PathError {}

#[derive(Debug)]
pub enum SettingsError {
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::Parse(e) => write!(f, "Invalid settings: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<io::Error> for SettingsError {
    fn from(e: io::Error) -> Self {
        SettingsError::Io(e)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::Parse(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    Layout(LayoutError),
    Build(BuildError),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::Layout(e) => write!(f, "layout failed: {}", e),
            ViewError::Build(e) => write!(f, "build failed: {}", e),
        }
    }
}

impl std::error::Error for ViewError {}

impl From<LayoutError> for ViewError {
    fn from(e: LayoutError) -> Self {
        ViewError::Layout(e)
    }
}

impl From<BuildError> for ViewError {
    fn from(e: BuildError) -> Self {
        ViewError::Build(e)
    }
}
