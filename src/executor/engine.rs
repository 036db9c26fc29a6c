use crate::{
    executor::{
        aggregate::AggregateTask,
        data::Data,
        expr::{BoundExpr, ExprCompiler},
        filter::FilterTask,
        join::JoinTask,
        project::ProjectTask,
        sort::{SortSpec, SortTask},
        table_scan::TableScanTask,
        task::execute,
    },
    functions::{FunctionDef, FunctionRegistry},
    planner::{
        expression::{CompareOp, Equation, Expr},
        select::{FromItem, Select, SortKey, TableMap},
    },
    types::{
        error::{DatabaseError, Result},
        value::Value,
    },
};

/// Turns a `Select` into a pipeline of tasks and hands back its cursor.
///
/// Pipeline shape: scans and joins, then the filter, then either
/// sort-on-group-key + aggregation + output sort, or sort + streaming
/// projection when the query has no aggregates.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    registry: FunctionRegistry,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            registry: FunctionRegistry::new(),
        }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Calls a function directly on values. Aggregates fold over `args` as
    /// if each were one row.
    pub fn function(&self, name: &str, args: &[Value]) -> Result<Value> {
        match self.registry.lookup(name)? {
            FunctionDef::Scalar(f) => {
                f.check_arity(args.len())?;
                f.call(args)
            }
            FunctionDef::Aggregate(f) => {
                let acc = args
                    .iter()
                    .try_fold(f.accumulator(), |acc, v| acc.fold(v))?;
                Ok(acc.finish())
            }
        }
    }

    pub fn execute<'a>(&self, select: &Select<'a>) -> Result<Box<dyn Data + 'a>> {
        if select.from.is_empty() {
            return Err(DatabaseError::config("select needs at least one table"));
        }
        let table_map = TableMap::build(&select.from);
        let columns = expand_wildcards(&select.columns, &table_map);
        if columns.is_empty() {
            return Err(DatabaseError::config("select has no output columns"));
        }

        let mut data = self.build_from(&select.from, &table_map)?;

        if let Some(condition) = &select.filter {
            let bound = ExprCompiler::new(&self.registry, &table_map).compile_condition(condition)?;
            data = execute(Box::new(FilterTask::new(data, bound)))?;
        }

        let mut compiler = ExprCompiler::new(&self.registry, &table_map).with_aggregates();
        let projections = columns
            .iter()
            .map(|c| compiler.compile(c))
            .collect::<Result<Vec<_>>>()?;

        let aggregate = !compiler.slots().is_empty() || !select.group_by.is_empty();
        tracing::debug!(
            tables = table_map.table_count(),
            columns = projections.len(),
            aggregate,
            filtered = select.filter.is_some(),
            "building query pipeline"
        );

        if aggregate {
            let group_keys = select
                .group_by
                .iter()
                .map(|c| table_map.resolve(*c))
                .collect::<Result<Vec<_>>>()?;
            if let Some(free) = compiler.free_columns().iter().find(|c| !group_keys.contains(c)) {
                return Err(DatabaseError::config(format!(
                    "column at offset {} must appear in group by or inside an aggregate",
                    free
                )));
            }
            let slots = compiler.into_slots();
            let output_keys = select
                .order_by
                .iter()
                .map(|o| {
                    let index = match &o.key {
                        SortKey::Position(p) => position_index(*p, columns.len())?,
                        SortKey::Expr(e) => columns.iter().position(|c| c == e).ok_or_else(|| {
                            DatabaseError::config("order by in an aggregate query must name an output column")
                        })?,
                    };
                    Ok(SortSpec::new(BoundExpr::Column(index), o.ascending))
                })
                .collect::<Result<Vec<_>>>()?;

            if !group_keys.is_empty() {
                let keys = group_keys
                    .iter()
                    .map(|&k| SortSpec::new(BoundExpr::Column(k), true))
                    .collect();
                data = execute(Box::new(SortTask::new(data, keys)))?;
            }
            data = execute(Box::new(AggregateTask::new(data, group_keys, slots, projections)))?;

            if !output_keys.is_empty() {
                data = execute(Box::new(SortTask::new(data, output_keys)))?;
            }
            return Ok(data);
        }

        if !select.order_by.is_empty() {
            let mut key_compiler = ExprCompiler::new(&self.registry, &table_map);
            let keys = select
                .order_by
                .iter()
                .map(|o| {
                    let expr = match &o.key {
                        SortKey::Position(p) => projections[position_index(*p, projections.len())?].clone(),
                        SortKey::Expr(e) => key_compiler.compile(e)?,
                    };
                    Ok(SortSpec::new(expr, o.ascending))
                })
                .collect::<Result<Vec<_>>>()?;
            data = execute(Box::new(SortTask::new(data, keys)))?;
        }

        execute(Box::new(ProjectTask::new(data, projections)))
    }

    /// Cross product of the FROM items, each built from scans and joins.
    fn build_from<'a>(&self, from: &[FromItem<'a>], table_map: &TableMap) -> Result<Box<dyn Data + 'a>> {
        let mut base = 0;
        let mut data: Option<Box<dyn Data + 'a>> = None;
        for item in from {
            let right = self.build_item(item, base, table_map)?;
            base += right.column_count();
            data = Some(match data {
                None => right,
                Some(left) => execute(Box::new(JoinTask::cross(left, right)))?,
            });
        }
        data.ok_or_else(|| DatabaseError::config("select needs at least one table"))
    }

    fn build_item<'a>(
        &self,
        item: &FromItem<'a>,
        base: usize,
        table_map: &TableMap,
    ) -> Result<Box<dyn Data + 'a>> {
        match item {
            FromItem::Table(table) => execute(Box::new(TableScanTask::new(*table))),
            FromItem::Join(join) => {
                let left = self.build_item(&join.left, base, table_map)?;
                let left_width = left.column_count();
                let right = self.build_item(&join.right, base + left_width, table_map)?;
                let right_width = right.column_count();
                let on = join_keys(&join.on, table_map, base, left_width, right_width)?;
                execute(Box::new(JoinTask::new(left, right, on)))
            }
        }
    }
}

/// Replaces each top-level `*` with every column of every table.
fn expand_wildcards(columns: &[Expr], table_map: &TableMap) -> Vec<Expr> {
    columns
        .iter()
        .flat_map(|c| match c {
            Expr::Wildcard => table_map.all_columns().into_iter().map(Expr::Column).collect(),
            other => vec![other.clone()],
        })
        .collect()
}

fn position_index(position: usize, count: usize) -> Result<usize> {
    if position == 0 || position > count {
        return Err(DatabaseError::config(format!(
            "order by position {} is outside 1..={}",
            position, count
        )));
    }
    Ok(position - 1)
}

/// Resolves a join equation to key offsets relative to each side.
fn join_keys(
    on: &Equation,
    table_map: &TableMap,
    base: usize,
    left_width: usize,
    right_width: usize,
) -> Result<(usize, usize)> {
    let (Expr::Column(a), CompareOp::Equal, Expr::Column(b)) = (&on.left, on.op, &on.right) else {
        return Err(DatabaseError::config("join condition must be column = column"));
    };
    let a = table_map.resolve(*a)?;
    let b = table_map.resolve(*b)?;

    let left = base..base + left_width;
    let right = base + left_width..base + left_width + right_width;
    if left.contains(&a) && right.contains(&b) {
        Ok((a - left.start, b - right.start))
    } else if left.contains(&b) && right.contains(&a) {
        Ok((b - left.start, a - right.start))
    } else {
        Err(DatabaseError::config(
            "join condition must compare a column of each joined side",
        ))
    }
}
