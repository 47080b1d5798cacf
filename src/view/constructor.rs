use serde::{Deserialize, Serialize};

use super::env::ViewEnv;
use crate::core::error::BuildError;
use crate::data::ObjectHandle;

/// Selects one of the ways a view constructor can show an object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Frag(pub u32);

/// Application hook that turns an object into boxes.
///
/// `display` is called with the environment positioned where the object's
/// boxes belong; it opens containers and adds attributes through the
/// environment, which records a notifier for every attribute it shows.
/// The same call is replayed for partial rebuilds, so it must depend only on
/// the data it reads.
pub trait ViewConstructor {
    fn display(&self, env: &mut ViewEnv<'_>, object: ObjectHandle, frag: Frag)
        -> Result<(), BuildError>;

    /// Height guess for a lazily displayed item; `None` uses the configured
    /// default.
    fn estimate_height(&self, _object: ObjectHandle, _frag: Frag, _width: i32) -> Option<i32> {
        None
    }
}
