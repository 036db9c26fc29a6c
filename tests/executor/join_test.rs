use jetdb::{
    Engine,
    executor::{
        data::{Data, MemoryData, collect_rows},
        join::JoinTask,
        table_source::MemoryTable,
        task::execute,
    },
    planner::{
        expression::{CompareOp, Equation, Expr, FQColumn},
        select::{FromItem, Select, SortKey},
    },
    types::{error::DatabaseError, value::Value},
};

fn memory(width: usize, rows: Vec<Vec<Value>>) -> Result<Box<dyn Data>, DatabaseError> {
    Ok(Box::new(MemoryData::new(width, rows)?))
}

fn pair(id: i32, label: &str) -> Vec<Value> {
    vec![Value::Int(id), Value::from(label)]
}

fn text(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

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

fn person() -> Result<MemoryTable, DatabaseError> {
    MemoryTable::new(
        "person",
        &["id", "name", "location"],
        [(1, "billy", 1), (2, "george", 2), (3, "susan", 2), (4, "mary", 3)]
            .into_iter()
            .map(|(id, name, location)| vec![Value::Int(id), Value::from(name), Value::Int(location)])
            .collect(),
    )
}

fn a() -> Result<MemoryTable, DatabaseError> {
    MemoryTable::new("a", &["id", "s"], vec![pair(1, "testing"), pair(2, "hi")])
}

fn location() -> Result<MemoryTable, DatabaseError> {
    MemoryTable::new(
        "location",
        &["id", "city", "state"],
        vec![
            vec![Value::Int(1), Value::from("salt lake"), Value::from("UT")],
            vec![Value::Int(2), Value::from("new york"), Value::from("NY")],
            vec![Value::Int(3), Value::from("vegas"), Value::from("NV")],
        ],
    )
}

#[test]
fn test_join_matches_only_equal_keys() -> Result<(), DatabaseError> {
    let left = memory(2, vec![pair(1, "a"), pair(2, "b")])?;
    let right = memory(2, vec![pair(1, "x"), pair(1, "y"), pair(3, "z")])?;
    let mut joined = execute(Box::new(JoinTask::new(left, right, (0, 0))))?;

    assert_eq!(joined.column_count(), 4);
    let rows = collect_rows(joined.as_mut())?;
    assert_eq!(
        rows,
        vec![
            vec![Value::Int(1), Value::from("a"), Value::Int(1), Value::from("x")],
            vec![Value::Int(1), Value::from("a"), Value::Int(1), Value::from("y")],
        ]
    );
    Ok(())
}

#[test]
fn test_join_never_matches_null_keys() -> Result<(), DatabaseError> {
    let left = memory(1, vec![vec![Value::Null], vec![Value::Int(7)]])?;
    let right = memory(1, vec![vec![Value::Null], vec![Value::Long(7)]])?;
    let mut joined = execute(Box::new(JoinTask::new(left, right, (0, 0))))?;
    let rows = collect_rows(joined.as_mut())?;
    assert_eq!(rows, vec![vec![Value::Int(7), Value::Long(7)]]);
    Ok(())
}

#[test]
fn test_cross_join_and_rewind() -> Result<(), DatabaseError> {
    let left = memory(1, vec![vec![Value::Int(1)], vec![Value::Int(2)]])?;
    let right = memory(1, vec![vec![Value::from("x")], vec![Value::from("y")]])?;
    let mut joined = execute(Box::new(JoinTask::cross(left, right)))?;

    let rows = collect_rows(joined.as_mut())?;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3], vec![Value::Int(2), Value::from("y")]);

    joined.rewind()?;
    assert_eq!(collect_rows(joined.as_mut())?, rows);
    Ok(())
}

#[test]
fn test_cross_join_with_empty_side() -> Result<(), DatabaseError> {
    let left = memory(1, vec![vec![Value::Int(1)]])?;
    let right = memory(1, Vec::new())?;
    let mut joined = execute(Box::new(JoinTask::cross(left, right)))?;
    assert!(!joined.next()?);
    assert!(joined.get(0).is_err());
    Ok(())
}

#[test]
fn test_comma_separated_tables_form_a_cross_product() -> Result<(), DatabaseError> {
    let (cars, person) = (cars()?, person()?);
    let select = Select::new(vec![
        Expr::column(0, 1),
        Expr::column(0, 2),
        Expr::column(1, 1),
    ])
    .from_table(&cars)
    .from_table(&person);

    let mut data = Engine::new().execute(&select)?;
    let rows = collect_rows(data.as_mut())?;
    assert_eq!(rows.len(), 20);
    assert_eq!(rows[0], text(&["ford", "contour", "billy"]));
    assert_eq!(rows[3], text(&["ford", "contour", "mary"]));
    assert_eq!(rows[19], text(&["ford", "F-150", "mary"]));
    Ok(())
}

#[test]
fn test_inner_join_on_owner() -> Result<(), DatabaseError> {
    let (cars, person) = (cars()?, person()?);
    let select = Select::new(vec![
        Expr::column(0, 1),
        Expr::column(0, 2),
        Expr::column(1, 1),
    ])
    .from_item(FromItem::inner_join(
        FromItem::table(&cars),
        FromItem::table(&person),
        Equation::eq(Expr::column(0, 3), Expr::column(1, 0)),
    ));

    let mut data = Engine::new().execute(&select)?;
    assert_eq!(
        collect_rows(data.as_mut())?,
        vec![
            text(&["ford", "contour", "billy"]),
            text(&["dodge", "viper", "susan"]),
            text(&["dodge", "stratus", "george"]),
            text(&["dodge", "ram", "susan"]),
            text(&["ford", "F-150", "billy"]),
        ]
    );
    Ok(())
}

#[test]
fn test_join_equation_sides_may_be_swapped() -> Result<(), DatabaseError> {
    let (cars, person) = (cars()?, person()?);
    let select = Select::new(vec![Expr::column(1, 1)])
        .from_item(FromItem::inner_join(
            FromItem::table(&cars),
            FromItem::table(&person),
            Equation::eq(Expr::column(1, 0), Expr::column(0, 3)),
        ));
    let mut data = Engine::new().execute(&select)?;
    assert_eq!(collect_rows(data.as_mut())?.len(), 5);
    Ok(())
}

#[test]
fn test_table_crossed_with_join() -> Result<(), DatabaseError> {
    let (a, cars, person) = (a()?, cars()?, person()?);
    let select = Select::new(vec![
        Expr::column(0, 1),
        Expr::column(1, 1),
        Expr::column(1, 2),
        Expr::column(2, 1),
    ])
    .from_table(&a)
    .from_item(FromItem::inner_join(
        FromItem::table(&cars),
        FromItem::table(&person),
        Equation::eq(Expr::column(1, 3), Expr::column(2, 0)),
    ));

    let mut data = Engine::new().execute(&select)?;
    let rows = collect_rows(data.as_mut())?;
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0], text(&["testing", "ford", "contour", "billy"]));
    assert_eq!(rows[2], text(&["testing", "dodge", "stratus", "george"]));
    assert_eq!(rows[5], text(&["hi", "ford", "contour", "billy"]));
    assert_eq!(rows[9], text(&["hi", "ford", "F-150", "billy"]));
    Ok(())
}

#[test]
fn test_nested_joins_with_order_by() -> Result<(), DatabaseError> {
    let (cars, person, location) = (cars()?, person()?, location()?);
    let select = Select::new(vec![
        Expr::column(0, 1),
        Expr::column(0, 2),
        Expr::column(1, 1),
        Expr::column(2, 1),
        Expr::column(2, 2),
    ])
    .from_item(FromItem::inner_join(
        FromItem::inner_join(
            FromItem::table(&cars),
            FromItem::table(&person),
            Equation::eq(Expr::column(0, 3), Expr::column(1, 0)),
        ),
        FromItem::table(&location),
        Equation::eq(Expr::column(1, 2), Expr::column(2, 0)),
    ))
    .order_by(SortKey::Expr(Expr::Column(FQColumn::new(1, 1))), true);

    let mut data = Engine::new().execute(&select)?;
    assert_eq!(
        collect_rows(data.as_mut())?,
        vec![
            text(&["ford", "contour", "billy", "salt lake", "UT"]),
            text(&["ford", "F-150", "billy", "salt lake", "UT"]),
            text(&["dodge", "stratus", "george", "new york", "NY"]),
            text(&["dodge", "viper", "susan", "new york", "NY"]),
            text(&["dodge", "ram", "susan", "new york", "NY"]),
        ]
    );
    Ok(())
}

#[test]
fn test_join_condition_must_be_column_equality() {
    let (cars, person) = (cars().unwrap(), person().unwrap());
    let engine = Engine::new();

    let not_equal = Select::new(vec![Expr::column(0, 0)]).from_item(FromItem::inner_join(
        FromItem::table(&cars),
        FromItem::table(&person),
        Equation::new(Expr::column(0, 3), CompareOp::NotEqual, Expr::column(1, 0)),
    ));
    assert!(matches!(engine.execute(&not_equal), Err(DatabaseError::Config { .. })));

    let literal = Select::new(vec![Expr::column(0, 0)]).from_item(FromItem::inner_join(
        FromItem::table(&cars),
        FromItem::table(&person),
        Equation::eq(Expr::column(0, 3), Expr::literal(1)),
    ));
    assert!(matches!(engine.execute(&literal), Err(DatabaseError::Config { .. })));

    let same_side = Select::new(vec![Expr::column(0, 0)]).from_item(FromItem::inner_join(
        FromItem::table(&cars),
        FromItem::table(&person),
        Equation::eq(Expr::column(0, 3), Expr::column(0, 0)),
    ));
    assert!(matches!(engine.execute(&same_side), Err(DatabaseError::Config { .. })));
}
