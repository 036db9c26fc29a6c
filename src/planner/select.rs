use std::fmt;

use crate::{
    executor::table_source::TableSource,
    planner::expression::{Condition, Equation, Expr, FQColumn},
    types::error::{DatabaseError, Result},
};

/// A resolved `SELECT`. Tables are borrowed from the caller; the engine
/// never parses SQL text.
pub struct Select<'a> {
    pub columns: Vec<Expr>,
    pub from: Vec<FromItem<'a>>,
    pub filter: Option<Condition>,
    pub group_by: Vec<FQColumn>,
    pub order_by: Vec<OrderBy>,
}

impl<'a> Select<'a> {
    pub fn new(columns: Vec<Expr>) -> Self {
        Self {
            columns,
            from: Vec::new(),
            filter: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
        }
    }

    pub fn from_table(mut self, table: &'a dyn TableSource) -> Self {
        self.from.push(FromItem::Table(table));
        self
    }

    pub fn from_item(mut self, item: FromItem<'a>) -> Self {
        self.from.push(item);
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(condition);
        self
    }

    pub fn group_by(mut self, columns: Vec<FQColumn>) -> Self {
        self.group_by = columns;
        self
    }

    pub fn order_by(mut self, key: SortKey, ascending: bool) -> Self {
        self.order_by.push(OrderBy { key, ascending });
        self
    }
}

impl fmt::Debug for Select<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select")
            .field("columns", &self.columns)
            .field("from", &self.from)
            .field("filter", &self.filter)
            .field("group_by", &self.group_by)
            .field("order_by", &self.order_by)
            .finish()
    }
}

pub enum FromItem<'a> {
    Table(&'a dyn TableSource),
    Join(Box<Join<'a>>),
}

impl<'a> FromItem<'a> {
    pub fn table(table: &'a dyn TableSource) -> Self {
        FromItem::Table(table)
    }

    pub fn inner_join(left: FromItem<'a>, right: FromItem<'a>, on: Equation) -> Self {
        FromItem::Join(Box::new(Join { left, right, on }))
    }

    /// Tables of this item in flattened left-to-right order.
    pub fn tables(&self, out: &mut Vec<&'a dyn TableSource>) {
        match self {
            FromItem::Table(t) => out.push(*t),
            FromItem::Join(join) => {
                join.left.tables(out);
                join.right.tables(out);
            }
        }
    }
}

impl fmt::Debug for FromItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FromItem::Table(t) => write!(f, "Table({})", t.name()),
            FromItem::Join(join) => f
                .debug_struct("Join")
                .field("left", &join.left)
                .field("right", &join.right)
                .field("on", &join.on)
                .finish(),
        }
    }
}

/// Inner equi-join of two FROM items.
pub struct Join<'a> {
    pub left: FromItem<'a>,
    pub right: FromItem<'a>,
    pub on: Equation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    /// 1-based position in the projection list.
    Position(usize),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub key: SortKey,
    pub ascending: bool,
}

/// Start offset of every flattened table in the combined row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMap {
    offsets: Vec<usize>,
    widths: Vec<usize>,
}

impl TableMap {
    pub fn build(from: &[FromItem<'_>]) -> Self {
        let mut tables = Vec::new();
        for item in from {
            item.tables(&mut tables);
        }
        let widths: Vec<usize> = tables.iter().map(|t| t.column_names().len()).collect();
        let mut offsets = Vec::with_capacity(widths.len());
        let mut next = 0;
        for w in &widths {
            offsets.push(next);
            next += w;
        }
        Self { offsets, widths }
    }

    pub fn table_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn width(&self) -> usize {
        self.offsets
            .last()
            .zip(self.widths.last())
            .map_or(0, |(o, w)| o + w)
    }

    pub fn table_width(&self, table: usize) -> Option<usize> {
        self.widths.get(table).copied()
    }

    pub fn resolve(&self, column: FQColumn) -> Result<usize> {
        match (self.offsets.get(column.table), self.widths.get(column.table)) {
            (Some(offset), Some(width)) if column.column < *width => Ok(offset + column.column),
            _ => Err(DatabaseError::config(format!(
                "column reference {}.{} does not resolve against {} table(s)",
                column.table,
                column.column,
                self.table_count()
            ))),
        }
    }

    /// Every column, table by table, as `FQColumn`s.
    pub fn all_columns(&self) -> Vec<FQColumn> {
        self.widths
            .iter()
            .enumerate()
            .flat_map(|(t, w)| (0..*w).map(move |c| FQColumn::new(t, c)))
            .collect()
    }
}
