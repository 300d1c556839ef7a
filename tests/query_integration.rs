//! End-to-end tests composing query iterators over the relation manager.

use relstore::catalog::RelationManager;
use relstore::datum::{Attribute, CompOp, Value};
use relstore::executor::{
    Aggregate, AggregateOp, BnlJoin, Condition, Executor, Filter, IndexScan, InlJoin, Project,
    SeqScan,
};
use relstore::tuple::Tuple;
use tempfile::tempdir;

fn setup(dir: &tempfile::TempDir) -> RelationManager {
    let mut rm = RelationManager::new(dir.path());
    rm.create_catalog().unwrap();

    rm.create_table(
        "emp",
        &[
            Attribute::int("id"),
            Attribute::varchar("name", 20),
            Attribute::int("dept"),
            Attribute::real("salary"),
        ],
    )
    .unwrap();
    rm.create_table(
        "dept",
        &[Attribute::int("dno"), Attribute::varchar("dname", 20)],
    )
    .unwrap();
    rm.create_index("emp", "id").unwrap();
    rm.create_index("dept", "dno").unwrap();

    for (id, name, dept, salary) in [
        (1, "ada", 10, 1000.0),
        (2, "bob", 20, 900.0),
        (3, "cyd", 10, 1100.0),
        (4, "dee", 20, 800.0),
        (5, "eli", 30, 700.0),
    ] {
        rm.insert_tuple(
            "emp",
            &Tuple::new(vec![
                Value::Int(id),
                Value::Varchar(name.into()),
                Value::Int(dept),
                Value::Real(salary),
            ]),
        )
        .unwrap();
    }
    for (dno, dname) in [(10, "eng"), (20, "ops")] {
        rm.insert_tuple(
            "dept",
            &Tuple::new(vec![Value::Int(dno), Value::Varchar(dname.into())]),
        )
        .unwrap();
    }
    rm
}

fn drain(exec: &mut dyn Executor) -> Vec<Tuple> {
    let mut out = Vec::new();
    while let Some(t) = exec.next_tuple().unwrap() {
        out.push(t);
    }
    out
}

#[test]
fn filter_then_project() {
    let dir = tempdir().unwrap();
    let rm = setup(&dir);

    let scan = SeqScan::new(&rm, "emp").unwrap();
    let filter = Filter::new(
        Box::new(scan),
        Condition::with_value("emp.salary", CompOp::Ge, Value::Real(900.0)),
    )
    .unwrap();
    let mut project = Project::new(
        Box::new(filter),
        &["emp.name".to_string(), "emp.salary".to_string()],
    )
    .unwrap();

    let rows = drain(&mut project);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].values[0], Value::Varchar("ada".into()));
    assert_eq!(
        project.attributes().iter().map(|a| a.name.clone()).collect::<Vec<_>>(),
        vec!["emp.name", "emp.salary"]
    );
}

#[test]
fn block_join_then_aggregate() {
    let dir = tempdir().unwrap();
    let rm = setup(&dir);

    // AVG(emp.salary) per joined department row.
    let left = SeqScan::new(&rm, "emp").unwrap();
    let right = SeqScan::new(&rm, "dept").unwrap();
    let join = BnlJoin::new(
        Box::new(left),
        right,
        &Condition::with_attr("emp.dept", CompOp::Eq, "dept.dno"),
        2,
    )
    .unwrap();

    let mut agg = Aggregate::new_grouped(
        Box::new(join),
        "emp.salary",
        "dept.dname",
        AggregateOp::Avg,
    )
    .unwrap();

    let mut rows = drain(&mut agg);
    rows.sort_by_key(|t| match &t.values[0] {
        Value::Varchar(s) => s.clone(),
        _ => String::new(),
    });
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].values, vec![Value::Varchar("eng".into()), Value::Real(1050.0)]);
    assert_eq!(rows[1].values, vec![Value::Varchar("ops".into()), Value::Real(850.0)]);
}

#[test]
fn index_join_matches_block_join() {
    let dir = tempdir().unwrap();
    let rm = setup(&dir);
    let condition = Condition::with_attr("emp.dept", CompOp::Eq, "dept.dno");

    let mut bnl = BnlJoin::new(
        Box::new(SeqScan::new(&rm, "emp").unwrap()),
        SeqScan::new(&rm, "dept").unwrap(),
        &condition,
        4,
    )
    .unwrap();
    let mut inl = InlJoin::new(
        Box::new(SeqScan::new(&rm, "emp").unwrap()),
        IndexScan::new(&rm, "dept", "dno").unwrap(),
        &condition,
    )
    .unwrap();

    let mut bnl_rows: Vec<Tuple> = drain(&mut bnl);
    let mut inl_rows: Vec<Tuple> = drain(&mut inl);
    let key = |t: &Tuple| match (&t.values[0], &t.values[4]) {
        (Value::Int(id), Value::Int(dno)) => (*id, *dno),
        _ => panic!("unexpected join row"),
    };
    bnl_rows.sort_by_key(key);
    inl_rows.sort_by_key(key);
    assert_eq!(bnl_rows, inl_rows);
    assert_eq!(bnl_rows.len(), 4);
}

#[test]
fn aggregate_over_index_scan() {
    let dir = tempdir().unwrap();
    let rm = setup(&dir);

    let scan = IndexScan::new(&rm, "emp", "id").unwrap();
    let mut agg = Aggregate::new(Box::new(scan), "emp.salary", AggregateOp::Max).unwrap();
    let rows = drain(&mut agg);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values, vec![Value::Real(1100.0)]);
    assert_eq!(agg.attributes()[0].name, "MAX(emp.salary)");
}

#[test]
fn count_with_filter() {
    let dir = tempdir().unwrap();
    let rm = setup(&dir);

    let scan = SeqScan::new(&rm, "emp").unwrap();
    let filter = Filter::new(
        Box::new(scan),
        Condition::with_value("emp.dept", CompOp::Eq, Value::Int(10)),
    )
    .unwrap();
    let mut agg = Aggregate::new(Box::new(filter), "emp.id", AggregateOp::Count).unwrap();
    let rows = drain(&mut agg);
    assert_eq!(rows[0].values, vec![Value::Real(2.0)]);
}
