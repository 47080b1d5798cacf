use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WsId(pub u32);

/// Formatting of one uniform run. Two runs with equal props may share a
/// segment engine; any difference is a formatting boundary.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TextProps {
    pub font: FontId,
    pub ws: WsId,
    pub size: i32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: u32,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            font: FontId(0),
            ws: WsId(0),
            size: 16,
            bold: false,
            italic: false,
            underline: false,
            color: 0x000000,
        }
    }
}

impl TextProps {
    pub fn with_size(mut self, size: i32) -> Self {
        self.size = size;
        self
    }

    pub fn with_font(mut self, font: FontId) -> Self {
        self.font = font;
        self
    }

    pub fn with_ws(mut self, ws: WsId) -> Self {
        self.ws = ws;
        self
    }

    pub fn ascent(&self) -> i32 {
        self.size.max(1).saturating_mul(4).saturating_add(4) / 5
    }

    pub fn descent(&self) -> i32 {
        self.size.max(1).saturating_add(3) / 4
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
    Auto,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    /// Left for left-to-right paragraphs, right for right-to-left ones.
    #[default]
    Leading,
    Left,
    Right,
    Center,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ParaProps {
    pub direction: Direction,
    pub align: Align,
}

impl ParaProps {
    pub fn rtl() -> Self {
        Self {
            direction: Direction::Rtl,
            align: Align::Leading,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/props.rs"]
mod tests;
