//! A view constructor driven by data instead of code.
//!
//! Each fragment is a list of operations replayed against the environment:
//!
//! ```json
//! { "frags": { "0": [ { "op": "open_paragraph" },
//!                     { "op": "string", "tag": 1 },
//!                     { "op": "close" } ] },
//!   "estimates": { "0": 40 } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::constructor::{Frag, ViewConstructor};
use super::env::ViewEnv;
use crate::boxes::ColumnWidth;
use crate::core::error::BuildError;
use crate::data::{AttrTag, ObjectHandle};
use crate::text::{Align, Direction, FontId, ParaProps, WsId};

fn one() -> usize {
    1
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ViewOp {
    OpenPile,
    OpenRow,
    OpenParagraph {
        #[serde(default)]
        direction: Direction,
        #[serde(default)]
        align: Align,
    },
    OpenTable {
        #[serde(default)]
        columns: Vec<ColumnWidth>,
    },
    OpenTableRow,
    OpenCell {
        #[serde(default = "one")]
        span: usize,
    },
    Close,
    String {
        tag: u32,
    },
    Int {
        tag: u32,
    },
    Object {
        tag: u32,
        frag: u32,
    },
    Vec {
        tag: u32,
        frag: u32,
    },
    LazyVec {
        tag: u32,
        frag: u32,
    },
    Literal {
        text: String,
    },
    Font {
        id: u32,
    },
    Ws {
        id: u32,
    },
    Size {
        size: i32,
    },
    Bold {
        #[serde(default = "yes")]
        on: bool,
    },
}

fn yes() -> bool {
    true
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSpec {
    pub frags: BTreeMap<u32, Vec<ViewOp>>,
    /// Per-item height guesses for lazy sequences shown with a fragment.
    pub estimates: BTreeMap<u32, i32>,
}

#[derive(Clone, Debug, Default)]
pub struct DeclarativeConstructor {
    spec: ViewSpec,
}

impl DeclarativeConstructor {
    pub fn new(spec: ViewSpec) -> Self {
        Self { spec }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    pub fn spec(&self) -> &ViewSpec {
        &self.spec
    }

    fn run(&self, env: &mut ViewEnv<'_>, op: &ViewOp) -> Result<(), BuildError> {
        match op {
            ViewOp::OpenPile => env.open_pile().map(drop),
            ViewOp::OpenRow => env.open_row().map(drop),
            ViewOp::OpenParagraph { direction, align } => env
                .open_paragraph(ParaProps {
                    direction: *direction,
                    align: *align,
                })
                .map(drop),
            ViewOp::OpenTable { columns } => env.open_table(columns.clone()).map(drop),
            ViewOp::OpenTableRow => env.open_table_row().map(drop),
            ViewOp::OpenCell { span } => env.open_table_cell(*span).map(drop),
            ViewOp::Close => env.close(),
            ViewOp::String { tag } => env.add_string_prop(AttrTag(*tag)),
            ViewOp::Int { tag } => env.add_int_prop(AttrTag(*tag)),
            ViewOp::Object { tag, frag } => env.add_obj_prop(AttrTag(*tag), Frag(*frag)),
            ViewOp::Vec { tag, frag } => env.add_obj_vec(AttrTag(*tag), Frag(*frag)),
            ViewOp::LazyVec { tag, frag } => env.add_lazy_vec(AttrTag(*tag), Frag(*frag)),
            ViewOp::Literal { text } => env.add_literal(text),
            ViewOp::Font { id } => {
                env.set_font(FontId(*id));
                Ok(())
            }
            ViewOp::Ws { id } => {
                env.set_ws(WsId(*id));
                Ok(())
            }
            ViewOp::Size { size } => {
                env.set_size(*size);
                Ok(())
            }
            ViewOp::Bold { on } => {
                env.set_bold(*on);
                Ok(())
            }
        }
    }
}

impl ViewConstructor for DeclarativeConstructor {
    fn display(
        &self,
        env: &mut ViewEnv<'_>,
        object: ObjectHandle,
        frag: Frag,
    ) -> Result<(), BuildError> {
        let Some(ops) = self.spec.frags.get(&frag.0) else {
            tracing::debug!(%object, frag = frag.0, "no such fragment, nothing shown");
            return Ok(());
        };
        for op in ops {
            self.run(env, op)?;
        }
        Ok(())
    }

    fn estimate_height(&self, _object: ObjectHandle, frag: Frag, _width: i32) -> Option<i32> {
        self.spec.estimates.get(&frag.0).copied()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/view/declarative.rs"]
mod tests;
