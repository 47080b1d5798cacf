//! 表格布局：解析列宽，行高取最高的单元格

use super::layout::LayoutCx;
use super::{BoxId, BoxKind, BoxTree, ColumnWidth};
use crate::core::geom::{Point, Size};

/// Column widths for a table `width` wide with `spacing` around every cell.
/// Fixed columns are served first, then percentages of the inner width;
/// auto columns share what is left, the last one taking the remainder.
pub fn resolve_columns(columns: &[ColumnWidth], width: i32, spacing: i32) -> Vec<i32> {
    let n = columns.len() as i32;
    let inner = (width - spacing.saturating_mul(n + 1)).max(0);
    let mut widths = vec![0i32; columns.len()];
    let mut used = 0i32;
    let mut autos = Vec::new();
    for (i, col) in columns.iter().enumerate() {
        match *col {
            ColumnWidth::Fixed(w) => widths[i] = w.max(0),
            ColumnWidth::Percent(p) => widths[i] = inner.saturating_mul(p.clamp(0, 100)) / 100,
            ColumnWidth::Auto => autos.push(i),
        }
        used = used.saturating_add(widths[i]);
    }
    let rest = (inner - used).max(0);
    if let Some((&last, others)) = autos.split_last() {
        let share = rest / autos.len() as i32;
        for &i in others {
            widths[i] = share;
        }
        widths[last] = rest - share * others.len() as i32;
    }
    widths
}

fn column_count(tree: &BoxTree, rows: &[BoxId]) -> usize {
    rows.iter()
        .map(|row| {
            tree.children(*row)
                .iter()
                .map(|cell| match tree.kind(*cell) {
                    Some(BoxKind::TableCell(c)) => c.col_span,
                    _ => 1,
                })
                .sum::<usize>()
        })
        .max()
        .unwrap_or(0)
}

pub(crate) fn layout_table(
    tree: &mut BoxTree,
    cx: &mut LayoutCx<'_>,
    id: BoxId,
    width: i32,
) -> Size {
    let (rows, mut columns) = match tree.kind(id) {
        Some(BoxKind::Table(t)) => (t.rows.clone(), t.columns.clone()),
        _ => return Size::ZERO,
    };
    let needed = column_count(tree, &rows);
    if columns.len() < needed {
        columns.resize(needed, ColumnWidth::Auto);
    }
    let spacing = cx.settings.table_cell_spacing.max(0);
    let col_widths = resolve_columns(&columns, width, spacing);
    let mut changed = false;
    if let Some(BoxKind::Table(t)) = tree.get_mut(id).map(|n| &mut n.kind) {
        if t.col_widths != col_widths {
            t.col_widths = col_widths;
            changed = true;
        }
    }
    if changed {
        // Rows cached their height for the old widths.
        for row in &rows {
            tree.mark_row_stale(*row);
        }
    }

    if rows.is_empty() {
        return Size::new(width, 0);
    }
    let mut y = spacing;
    for row in rows {
        let height = tree.layout_box(cx, row, width).height;
        tree.set_origin(row, Point::new(0, y));
        y = y.saturating_add(height).saturating_add(spacing);
    }
    Size::new(width, y)
}

/// A row laid out on its own, using the widths its table resolved last.
pub(crate) fn layout_row_in_table(
    tree: &mut BoxTree,
    cx: &mut LayoutCx<'_>,
    id: BoxId,
    width: i32,
) -> Size {
    let col_widths = tree
        .parent(id)
        .and_then(|t| match tree.kind(t) {
            Some(BoxKind::Table(t)) => Some(t.col_widths.clone()),
            _ => None,
        })
        .unwrap_or_default();
    let spacing = cx.settings.table_cell_spacing.max(0);
    let height = lay_cells(tree, cx, id, &col_widths, spacing);
    Size::new(width, height)
}

fn lay_cells(
    tree: &mut BoxTree,
    cx: &mut LayoutCx<'_>,
    row: BoxId,
    col_widths: &[i32],
    spacing: i32,
) -> i32 {
    let cells = tree.children(row).to_vec();
    let mut x = spacing;
    let mut col = 0usize;
    let mut height = 0i32;
    let mut placed = Vec::with_capacity(cells.len());
    for cell in cells {
        let span = match tree.kind(cell) {
            Some(BoxKind::TableCell(c)) => c.col_span,
            _ => 1,
        };
        let w = if span == 0 {
            0
        } else {
            let end = (col + span).min(col_widths.len());
            let cols = col_widths.get(col..end).unwrap_or(&[]);
            cols.iter().sum::<i32>() + spacing * (cols.len().saturating_sub(1)) as i32
        };
        let size = tree.layout_box(cx, cell, w);
        tree.set_origin(cell, Point::new(x, 0));
        height = height.max(size.height);
        placed.push((cell, w));
        x = x.saturating_add(w).saturating_add(spacing);
        col += span;
    }
    for (cell, w) in placed {
        tree.set_size(cell, Size::new(w, height));
    }
    height
}

impl BoxTree {
    fn mark_row_stale(&mut self, row: BoxId) {
        if let Some(node) = self.get_mut(row) {
            node.dirty = true;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/boxes/table.rs"]
mod tests;
