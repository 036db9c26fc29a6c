use jetdb::{
    Engine,
    executor::{
        aggregate::AggregateTask,
        data::{Data, MemoryData, collect_rows},
        expr::{AggregateSlot, BoundExpr},
        table_source::MemoryTable,
        task::execute,
    },
    functions::aggregate::AggregateFunction,
    planner::{
        expression::{CompareOp, Condition, Expr, FQColumn},
        select::{Select, SortKey},
    },
    types::{error::DatabaseError, value::Value},
};

fn cars() -> Result<MemoryTable, DatabaseError> {
    MemoryTable::new(
        "cars",
        &["id", "make", "model", "owner"],
        [
            (1, "ford", "contour", 1),
            (2, "dodge", "viper", 3),
            (3, "dodge", "stratus", 2),
            (4, "dodge", "ram", 3),
            (5, "ford", "F-150", 1),
        ]
        .into_iter()
        .map(|(id, make, model, owner)| {
            vec![Value::Int(id), Value::from(make), Value::from(model), Value::Int(owner)]
        })
        .collect(),
    )
}

fn single(table: &MemoryTable, columns: Vec<Expr>) -> Result<Vec<Vec<Value>>, DatabaseError> {
    let mut data = Engine::new().execute(&Select::new(columns).from_table(table))?;
    collect_rows(data.as_mut())
}

fn sum_slot(column: usize) -> AggregateSlot {
    AggregateSlot {
        function: AggregateFunction::Sum,
        arg: Some(BoundExpr::Column(column)),
    }
}

#[test]
fn test_grouped_sum_over_sorted_input() -> Result<(), DatabaseError> {
    let input: Box<dyn Data> = Box::new(MemoryData::new(
        2,
        vec![
            vec![Value::Int(1), Value::Int(10)],
            vec![Value::Int(1), Value::Int(20)],
            vec![Value::Int(2), Value::Int(5)],
        ],
    )?);
    let task = AggregateTask::new(
        input,
        vec![0],
        vec![sum_slot(1)],
        vec![BoundExpr::Column(0), BoundExpr::Aggregate(0)],
    );
    let mut data = execute(Box::new(task))?;
    assert_eq!(
        collect_rows(data.as_mut())?,
        vec![
            vec![Value::Int(1), Value::Long(30)],
            vec![Value::Int(2), Value::Long(5)],
        ]
    );
    Ok(())
}

#[test]
fn test_empty_input_without_groups_yields_one_row() -> Result<(), DatabaseError> {
    let input: Box<dyn Data> = Box::new(MemoryData::new(2, Vec::new())?);
    let count = AggregateSlot {
        function: AggregateFunction::Count,
        arg: None,
    };
    let task = AggregateTask::new(
        input,
        Vec::new(),
        vec![count, sum_slot(1)],
        vec![BoundExpr::Aggregate(0), BoundExpr::Aggregate(1)],
    );
    let mut data = execute(Box::new(task))?;
    assert_eq!(
        collect_rows(data.as_mut())?,
        vec![vec![Value::Long(0), Value::Null]]
    );
    Ok(())
}

#[test]
fn test_empty_input_with_groups_yields_nothing() -> Result<(), DatabaseError> {
    let input: Box<dyn Data> = Box::new(MemoryData::new(2, Vec::new())?);
    let task = AggregateTask::new(
        input,
        vec![0],
        vec![sum_slot(1)],
        vec![BoundExpr::Column(0), BoundExpr::Aggregate(0)],
    );
    let mut data = execute(Box::new(task))?;
    assert!(!data.next()?);
    Ok(())
}

#[test]
fn test_unsorted_input_fragments_groups() -> Result<(), DatabaseError> {
    let input: Box<dyn Data> = Box::new(MemoryData::new(
        2,
        vec![
            vec![Value::Int(1), Value::Int(1)],
            vec![Value::Int(2), Value::Int(1)],
            vec![Value::Int(1), Value::Int(1)],
        ],
    )?);
    let task = AggregateTask::new(
        input,
        vec![0],
        vec![sum_slot(1)],
        vec![BoundExpr::Column(0), BoundExpr::Aggregate(0)],
    );
    let mut data = execute(Box::new(task))?;
    assert_eq!(collect_rows(data.as_mut())?.len(), 3);
    Ok(())
}

#[test]
fn test_count_star() -> Result<(), DatabaseError> {
    let cars = cars()?;
    assert_eq!(single(&cars, vec![Expr::count_star()])?, vec![vec![Value::Long(5)]]);
    assert_eq!(
        single(&cars, vec![Expr::count_star(), Expr::literal(1)])?,
        vec![vec![Value::Long(5), Value::Int(1)]]
    );
    Ok(())
}

#[test]
fn test_min_and_max() -> Result<(), DatabaseError> {
    let cars = cars()?;
    let model = || Expr::column(0, 2);
    let id = || Expr::column(0, 0);

    assert_eq!(single(&cars, vec![Expr::max(model())])?, vec![vec![Value::from("viper")]]);
    assert_eq!(single(&cars, vec![Expr::min(model())])?, vec![vec![Value::from("F-150")]]);
    assert_eq!(single(&cars, vec![Expr::max(id())])?, vec![vec![Value::Int(5)]]);
    assert_eq!(single(&cars, vec![Expr::min(id())])?, vec![vec![Value::Int(1)]]);
    assert_eq!(
        single(&cars, vec![Expr::min(Expr::lower(model()))])?,
        vec![vec![Value::from("contour")]]
    );
    assert_eq!(
        single(&cars, vec![Expr::max(Expr::length(model()))])?,
        vec![vec![Value::Int(7)]]
    );
    assert_eq!(
        single(&cars, vec![Expr::min(Expr::length(model()))])?,
        vec![vec![Value::Int(3)]]
    );
    Ok(())
}

#[test]
fn test_sum_and_scalar_over_aggregate() -> Result<(), DatabaseError> {
    let cars = cars()?;
    assert_eq!(
        single(&cars, vec![Expr::sum(Expr::column(0, 0))])?,
        vec![vec![Value::Long(15)]]
    );
    assert_eq!(
        single(&cars, vec![Expr::upper(Expr::max(Expr::column(0, 2)))])?,
        vec![vec![Value::from("VIPER")]]
    );
    Ok(())
}

#[test]
fn test_group_by_make() -> Result<(), DatabaseError> {
    let cars = cars()?;
    let select = Select::new(vec![Expr::count_star(), Expr::column(0, 1)])
        .from_table(&cars)
        .group_by(vec![FQColumn::new(0, 1)]);
    let mut data = Engine::new().execute(&select)?;
    assert_eq!(
        collect_rows(data.as_mut())?,
        vec![
            vec![Value::Long(3), Value::from("dodge")],
            vec![Value::Long(2), Value::from("ford")],
        ]
    );
    Ok(())
}

#[test]
fn test_group_by_with_output_order() -> Result<(), DatabaseError> {
    let cars = cars()?;
    let select = Select::new(vec![Expr::count_star(), Expr::column(0, 1)])
        .from_table(&cars)
        .group_by(vec![FQColumn::new(0, 1)])
        .order_by(SortKey::Position(2), false);
    let mut data = Engine::new().execute(&select)?;
    assert_eq!(
        collect_rows(data.as_mut())?,
        vec![
            vec![Value::Long(2), Value::from("ford")],
            vec![Value::Long(3), Value::from("dodge")],
        ]
    );

    let by_name = Select::new(vec![Expr::sum(Expr::length(Expr::column(0, 2))), Expr::column(0, 1)])
        .from_table(&cars)
        .group_by(vec![FQColumn::new(0, 1)])
        .order_by(SortKey::Expr(Expr::column(0, 1)), false);
    let mut data = Engine::new().execute(&by_name)?;
    assert_eq!(
        collect_rows(data.as_mut())?,
        vec![
            vec![Value::Long(12), Value::from("ford")],
            vec![Value::Long(15), Value::from("dodge")],
        ]
    );
    Ok(())
}

#[test]
fn test_aggregate_after_filter() -> Result<(), DatabaseError> {
    let cars = cars()?;
    let select = Select::new(vec![Expr::count_star(), Expr::max(Expr::column(0, 0))])
        .from_table(&cars)
        .filter(Condition::compare(
            Expr::column(0, 1),
            CompareOp::Equal,
            Expr::literal("dodge"),
        ));
    let mut data = Engine::new().execute(&select)?;
    assert_eq!(
        collect_rows(data.as_mut())?,
        vec![vec![Value::Long(3), Value::Int(4)]]
    );

    let nothing = Select::new(vec![Expr::count_star(), Expr::sum(Expr::column(0, 0))])
        .from_table(&cars)
        .filter(Condition::compare(Expr::literal(1), CompareOp::Equal, Expr::literal(0)));
    let mut data = Engine::new().execute(&nothing)?;
    assert_eq!(
        collect_rows(data.as_mut())?,
        vec![vec![Value::Long(0), Value::Null]]
    );
    Ok(())
}

#[test]
fn test_invalid_aggregate_queries() {
    let cars = cars().unwrap();
    let engine = Engine::new();
    let config_error = |columns: Vec<Expr>, group_by: Vec<FQColumn>| {
        let select = Select::new(columns).from_table(&cars).group_by(group_by);
        matches!(engine.execute(&select), Err(DatabaseError::Config { .. }))
    };

    // count takes only '*'
    assert!(config_error(vec![Expr::function("count", vec![Expr::column(0, 1)])], vec![]));
    // nested aggregates
    assert!(config_error(vec![Expr::max(Expr::min(Expr::column(0, 0)))], vec![]));
    // make is neither grouped nor aggregated
    assert!(config_error(vec![Expr::count_star(), Expr::column(0, 1)], vec![]));
    assert!(config_error(
        vec![Expr::count_star(), Expr::column(0, 2)],
        vec![FQColumn::new(0, 1)]
    ));
    // aggregate arity
    assert!(config_error(
        vec![Expr::function("sum", vec![Expr::column(0, 0), Expr::column(0, 3)])],
        vec![]
    ));
    // unknown group column
    assert!(config_error(vec![Expr::count_star()], vec![FQColumn::new(0, 9)]));
}

#[test]
fn test_aggregate_in_filter_is_rejected() {
    let cars = cars().unwrap();
    let select = Select::new(vec![Expr::column(0, 0)])
        .from_table(&cars)
        .filter(Condition::compare(
            Expr::count_star(),
            CompareOp::GreaterThan,
            Expr::literal(1),
        ));
    assert!(matches!(
        Engine::new().execute(&select),
        Err(DatabaseError::Config { .. })
    ));
}

#[test]
fn test_sum_of_text_is_type_mismatch() {
    let cars = cars().unwrap();
    let select = Select::new(vec![Expr::sum(Expr::column(0, 1))]).from_table(&cars);
    assert!(matches!(
        Engine::new().execute(&select),
        Err(DatabaseError::TypeMismatch { .. })
    ));
}

#[test]
fn test_bad_output_order_is_rejected_before_aggregating() {
    let cars = cars().unwrap();
    let engine = Engine::new();
    // sum over text would fail while aggregating; the order key is checked first
    let by_position = Select::new(vec![Expr::sum(Expr::column(0, 1))])
        .from_table(&cars)
        .order_by(SortKey::Position(2), true);
    assert!(matches!(
        engine.execute(&by_position),
        Err(DatabaseError::Config { .. })
    ));

    let by_unprojected = Select::new(vec![Expr::sum(Expr::column(0, 1)), Expr::column(0, 1)])
        .from_table(&cars)
        .group_by(vec![FQColumn::new(0, 1)])
        .order_by(SortKey::Expr(Expr::column(0, 2)), true);
    assert!(matches!(
        engine.execute(&by_unprojected),
        Err(DatabaseError::Config { .. })
    ));
}
