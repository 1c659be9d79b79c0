//! Migration planner: turns a batch of table descriptors into an ordered,
//! deduplicated set of schema nodes (`delegate`), topologically sorts that
//! set (`order_db_objects`), and diffs two ordered snapshots into a replayable
//! action sequence (`build_actions`).

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::schema::descriptor::{BaseType, TableDescriptor};
use crate::schema::node::{ColumnNode, ColumnTypeRef, ConstraintNode, EnumTypeNode, SchemaNode, TableNode};
use crate::schema::recorder::ActionRecorder;
use crate::types::ConstraintType;

/// A dependency edge: either a single representation key that must already
/// be emitted, or a set of keys any one of which satisfies the edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dependency {
    Key(String),
    AnyOf(Vec<String>),
}

impl Dependency {
    fn satisfied(&self, emitted: &HashSet<String>) -> bool {
        match self {
            Dependency::Key(k) => emitted.contains(k),
            Dependency::AnyOf(keys) => keys.iter().any(|k| emitted.contains(k)),
        }
    }

    fn keys(&self) -> Vec<&String> {
        match self {
            Dependency::Key(k) => vec![k],
            Dependency::AnyOf(keys) => keys.iter().collect(),
        }
    }
}

/// An ordered, deduplicated set of schema nodes: the planner's unit of
/// comparison between "current" and "desired" states.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub nodes: IndexMap<String, SchemaNode>,
    pub order: Vec<String>,
}

impl Snapshot {
    pub fn get(&self, key: &str) -> Option<&SchemaNode> {
        self.nodes.get(key)
    }
}

pub struct MigrationPlanner;

impl MigrationPlanner {
    /// Phase A: expand a batch of table descriptors into `(SchemaNode, deps)`
    /// pairs. Two passes: first collect each table's primary-key column set
    /// (needed so a foreign key can depend on the target's *full* composite
    /// primary-key constraint, not just the single referenced column), then
    /// emit nodes.
    pub fn delegate(tables: &[TableDescriptor]) -> Result<Vec<(SchemaNode, Vec<Dependency>)>> {
        let mut pk_columns: HashMap<String, BTreeSet<String>> = HashMap::new();
        for table in tables {
            let cols: BTreeSet<String> = table
                .fields
                .iter()
                .filter(|f| f.primary_key)
                .map(|f| f.name.clone())
                .collect();
            if !cols.is_empty() {
                pk_columns.insert(table.table_name.clone(), cols);
            }
        }

        let mut out = Vec::new();

        for table in tables {
            let table_node = SchemaNode::Table(TableNode::new(table.table_name.clone()));
            out.push((table_node, Vec::new()));

            let mut table_pk_cols: BTreeSet<String> = BTreeSet::new();

            for field in &table.fields {
                if let Some((enum_name, enum_values)) = Self::enum_ref(&field.base_type) {
                    let enum_node = EnumTypeNode {
                        name: enum_name.to_string(),
                        values: enum_values.iter().cloned().collect(),
                        referenced_by: BTreeSet::from([(table.table_name.clone(), field.name.clone())]),
                    };
                    out.push((SchemaNode::EnumType(enum_node), vec![Dependency::Key(table.table_name.clone())]));
                }

                let (type_ref, mut deps) = Self::resolve_base_type(&table.table_name, field);
                deps.push(Dependency::Key(table.table_name.clone()));

                let column_node = ColumnNode {
                    table: table.table_name.clone(),
                    name: field.name.clone(),
                    column_type: type_ref,
                    is_list: matches!(field.base_type, BaseType::ListOf(_)),
                    nullable: field.nullable,
                    autoincrement: field.autoincrement,
                };
                out.push((SchemaNode::Column(column_node), deps));

                if field.primary_key {
                    table_pk_cols.insert(field.name.clone());
                }

                if field.unique {
                    let cols = BTreeSet::from([field.name.clone()]);
                    let node = ConstraintNode::new(table.table_name.clone(), cols, ConstraintType::Unique, None, None)?;
                    out.push((
                        SchemaNode::Constraint(node),
                        vec![
                            Dependency::Key(table.table_name.clone()),
                            Dependency::Key(format!("{}.{}", table.table_name, field.name)),
                        ],
                    ));
                }

                if field.index {
                    let cols = BTreeSet::from([field.name.clone()]);
                    let node = ConstraintNode::new(table.table_name.clone(), cols, ConstraintType::Index, None, None)?;
                    out.push((
                        SchemaNode::Constraint(node),
                        vec![
                            Dependency::Key(table.table_name.clone()),
                            Dependency::Key(format!("{}.{}", table.table_name, field.name)),
                        ],
                    ));
                }

                if let Some(check_expr) = &field.check {
                    let cols = BTreeSet::from([field.name.clone()]);
                    let node = ConstraintNode::new(
                        table.table_name.clone(),
                        cols,
                        ConstraintType::Check,
                        None,
                        Some(check_expr.clone()),
                    )?;
                    out.push((
                        SchemaNode::Constraint(node),
                        vec![
                            Dependency::Key(table.table_name.clone()),
                            Dependency::Key(format!("{}.{}", table.table_name, field.name)),
                        ],
                    ));
                }

                if let Some(fk) = &field.foreign_key {
                    let cols = BTreeSet::from([field.name.clone()]);
                    let node =
                        ConstraintNode::new(table.table_name.clone(), cols, ConstraintType::ForeignKey, Some(fk.clone()), None)?;

                    let target_pk_dep = match pk_columns.get(&fk.target_table) {
                        Some(target_cols) => Dependency::Key(crate::schema::node::constraint_representation(
                            &fk.target_table,
                            target_cols,
                            ConstraintType::PrimaryKey,
                        )),
                        None => Dependency::Key(format!("{}.{}", fk.target_table, fk.target_column)),
                    };

                    out.push((
                        SchemaNode::Constraint(node),
                        vec![
                            Dependency::Key(table.table_name.clone()),
                            Dependency::Key(format!("{}.{}", table.table_name, field.name)),
                            target_pk_dep,
                        ],
                    ));
                }
            }

            if !table_pk_cols.is_empty() {
                let node = ConstraintNode::new(table.table_name.clone(), table_pk_cols.clone(), ConstraintType::PrimaryKey, None, None)?;
                let mut deps: Vec<Dependency> = vec![Dependency::Key(table.table_name.clone())];
                for col in &table_pk_cols {
                    deps.push(Dependency::Key(format!("{}.{}", table.table_name, col)));
                }
                out.push((SchemaNode::Constraint(node), deps));
            }
        }

        Ok(out)
    }

    fn resolve_base_type(
        table_name: &str,
        field: &crate::schema::descriptor::FieldDescriptor,
    ) -> (ColumnTypeRef, Vec<Dependency>) {
        match &field.base_type {
            BaseType::Primitive(t) => (ColumnTypeRef::Concrete(*t), Vec::new()),
            BaseType::ListOf(inner) => Self::resolve_base_type(
                table_name,
                &crate::schema::descriptor::FieldDescriptor {
                    base_type: (**inner).clone(),
                    ..field.clone()
                },
            ),
            BaseType::EnumRef { name, .. } => (ColumnTypeRef::EnumPointer(name.clone()), vec![Dependency::Key(name.clone())]),
        }
    }

    /// Find the enum name/values a field's type resolves to, looking through
    /// `ListOf` wrappers. `None` for primitive fields.
    fn enum_ref(base_type: &BaseType) -> Option<(&str, &Vec<String>)> {
        match base_type {
            BaseType::EnumRef { name, values } => Some((name.as_str(), values)),
            BaseType::ListOf(inner) => Self::enum_ref(inner),
            BaseType::Primitive(_) => None,
        }
    }

    /// Phase B: canonicalize duplicate representation keys via `merge`,
    /// union their dependency lists, validate every dependency resolves to a
    /// node actually present, then run a scan-based Kahn's sort breaking ties
    /// by `(tier, became-ready rank)` among nodes whose deps are met. Tables
    /// sort first and constraints/indexes last; among the tables' columns
    /// and types, a node keeps the rank it was assigned the round its
    /// dependencies first became satisfied, so a type blocking a column only
    /// displaces unrelated, already-ready columns when the type itself
    /// became ready earlier in declaration order — it never races ahead of
    /// work that has been ready and waiting longer.
    pub fn order_db_objects(raw: Vec<(SchemaNode, Vec<Dependency>)>) -> Result<Snapshot> {
        let mut nodes: IndexMap<String, SchemaNode> = IndexMap::new();
        let mut deps: HashMap<String, Vec<Dependency>> = HashMap::new();

        for (node, node_deps) in raw {
            let key = node.representation();
            match nodes.get(&key) {
                Some(existing) => {
                    let merged = existing.merge(&node)?;
                    nodes.insert(key.clone(), merged);
                }
                None => {
                    nodes.insert(key.clone(), node);
                }
            }
            deps.entry(key).or_default().extend(node_deps);
        }

        for (key, dep_list) in &deps {
            for dep in dep_list {
                let resolved = dep.keys().iter().any(|k| nodes.contains_key(k.as_str()));
                if !resolved {
                    return Err(Error::unresolved_dependency(format!(
                        "{} (required by {})",
                        match dep {
                            Dependency::Key(k) => k.clone(),
                            Dependency::AnyOf(ks) => ks.join(" | "),
                        },
                        key
                    )));
                }
            }
        }

        let mut remaining: HashSet<String> = nodes.keys().cloned().collect();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut order: Vec<String> = Vec::new();
        let mut rank: HashMap<String, usize> = HashMap::new();
        let mut next_rank: usize = 0;

        while !remaining.is_empty() {
            // Assign a rank, in stable insertion order, to every node that
            // newly became ready this pass. A node keeps its rank forever
            // once assigned, so earlier-ready work is never displaced by a
            // node that only becomes ready later, regardless of tier.
            for key in nodes.keys() {
                if rank.contains_key(key) || !remaining.contains(key) {
                    continue;
                }
                let satisfied = deps.get(key).map_or(true, |d| d.iter().all(|dep| dep.satisfied(&emitted)));
                if satisfied {
                    rank.insert(key.clone(), next_rank);
                    next_rank += 1;
                }
            }

            let mut ready: Vec<&String> = remaining.iter().filter(|key| rank.contains_key(key.as_str())).collect();

            if ready.is_empty() {
                let stuck: Vec<String> = remaining.iter().cloned().collect();
                return Err(Error::unresolved_dependency(format!(
                    "cyclic or unsatisfiable dependency among: {}",
                    stuck.join(", ")
                )));
            }

            ready.sort_by_key(|key| (nodes[key.as_str()].tier(), rank[key.as_str()], (*key).clone()));
            let next = ready[0].clone();
            remaining.remove(&next);
            emitted.insert(next.clone());
            order.push(next);
        }

        Ok(Snapshot { nodes, order })
    }

    /// Phase C: diff two ordered snapshots into a replayable action sequence.
    /// Creations and modifications replay in `next.order`; destructions
    /// replay in the reverse of `prev.order` so dependents are torn down
    /// before their dependencies.
    pub fn build_actions(prev: &Snapshot, next: &Snapshot) -> Result<ActionRecorder> {
        let mut rec = ActionRecorder::new();

        for key in &next.order {
            let node = &next.nodes[key];
            match prev.get(key) {
                None => node.create(&mut rec),
                Some(prev_node) => {
                    if node != prev_node {
                        node.migrate(prev_node, &mut rec)?;
                    }
                }
            }
        }

        for key in prev.order.iter().rev() {
            if !next.nodes.contains_key(key) {
                prev.nodes[key].destroy(&mut rec);
            }
        }

        Ok(rec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::descriptor::FieldDescriptor;
    use crate::schema::recorder::{Action, Entry};
    use crate::types::ColumnType;

    fn plan(tables: &[TableDescriptor]) -> Snapshot {
        let raw = MigrationPlanner::delegate(tables).unwrap();
        MigrationPlanner::order_db_objects(raw).unwrap()
    }

    fn actions_only(rec: &ActionRecorder) -> Vec<&Action> {
        rec.entries
            .iter()
            .filter_map(|e| match e {
                Entry::Action(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn fresh_table_creates_table_then_columns_then_pk() {
        let tables = vec![TableDescriptor::new(
            "modela",
            vec![
                FieldDescriptor::new("id", BaseType::Primitive(ColumnType::Integer))
                    .primary_key()
                    .autoincrement(),
                FieldDescriptor::new("name", BaseType::Primitive(ColumnType::Text)),
            ],
        )];

        let empty = Snapshot::default();
        let next = plan(&tables);
        let rec = MigrationPlanner::build_actions(&empty, &next).unwrap();
        let actions = actions_only(&rec);

        assert!(matches!(actions[0], Action::AddTable { table_name } if table_name == "modela"));
        let has_pk = actions.iter().any(|a| matches!(a, Action::AddConstraint { constraint, .. } if *constraint == ConstraintType::PrimaryKey));
        assert!(has_pk);

        let pk_pos = actions
            .iter()
            .position(|a| matches!(a, Action::AddConstraint { constraint, .. } if *constraint == ConstraintType::PrimaryKey))
            .unwrap();
        let id_col_pos = actions
            .iter()
            .position(|a| matches!(a, Action::AddColumn { column_name, .. } if column_name == "id"))
            .unwrap();
        assert!(id_col_pos < pk_pos);
    }

    #[test]
    fn enum_column_waits_for_enum_type_before_not_null() {
        let tables = vec![TableDescriptor::new(
            "modela",
            vec![
                FieldDescriptor::new("id", BaseType::Primitive(ColumnType::Integer))
                    .primary_key()
                    .autoincrement(),
                FieldDescriptor::new(
                    "animal",
                    BaseType::EnumRef {
                        name: "oldvalues".into(),
                        values: vec!["CAT".into(), "DOG".into()],
                    },
                ),
            ],
        )];

        let empty = Snapshot::default();
        let next = plan(&tables);
        let rec = MigrationPlanner::build_actions(&empty, &next).unwrap();
        let actions = actions_only(&rec);

        let type_pos = actions.iter().position(|a| matches!(a, Action::AddType { .. })).unwrap();
        let animal_col_pos = actions
            .iter()
            .position(|a| matches!(a, Action::AddColumn { column_name, .. } if column_name == "animal"))
            .unwrap();
        assert!(type_pos < animal_col_pos);
    }

    #[test]
    fn fresh_table_with_enum_and_unrelated_column_matches_literal_sequence() {
        let tables = vec![TableDescriptor::new(
            "modela",
            vec![
                FieldDescriptor::new("id", BaseType::Primitive(ColumnType::Integer)).primary_key(),
                FieldDescriptor::new(
                    "animal",
                    BaseType::EnumRef {
                        name: "oldvalues".into(),
                        values: vec!["A".into()],
                    },
                ),
                FieldDescriptor::new("was_nullable", BaseType::Primitive(ColumnType::Varchar)).nullable(),
            ],
        )];

        let empty = Snapshot::default();
        let next = plan(&tables);
        let rec = MigrationPlanner::build_actions(&empty, &next).unwrap();
        let actions = actions_only(&rec);

        assert_eq!(
            actions,
            vec![
                &Action::AddTable {
                    table_name: "modela".to_string(),
                },
                &Action::AddColumn {
                    table_name: "modela".to_string(),
                    column_name: "id".to_string(),
                    explicit_data_type: Some(ColumnType::Integer),
                    explicit_data_is_list: false,
                    custom_data_type: None,
                },
                &Action::AddNotNull {
                    table_name: "modela".to_string(),
                    column_name: "id".to_string(),
                },
                &Action::AddType {
                    type_name: "oldvalues".to_string(),
                    values: vec!["A".to_string()],
                },
                &Action::AddColumn {
                    table_name: "modela".to_string(),
                    column_name: "was_nullable".to_string(),
                    explicit_data_type: Some(ColumnType::Varchar),
                    explicit_data_is_list: false,
                    custom_data_type: None,
                },
                &Action::AddColumn {
                    table_name: "modela".to_string(),
                    column_name: "animal".to_string(),
                    explicit_data_type: None,
                    explicit_data_is_list: false,
                    custom_data_type: Some("oldvalues".to_string()),
                },
                &Action::AddNotNull {
                    table_name: "modela".to_string(),
                    column_name: "animal".to_string(),
                },
                &Action::AddConstraint {
                    table_name: "modela".to_string(),
                    constraint: ConstraintType::PrimaryKey,
                    constraint_name: "modela_pkey".to_string(),
                    columns: vec!["id".to_string()],
                    constraint_args: None,
                },
            ]
        );
    }

    #[test]
    fn foreign_key_depends_on_target_primary_key() {
        let tables = vec![
            TableDescriptor::new(
                "users",
                vec![FieldDescriptor::new("id", BaseType::Primitive(ColumnType::Integer))
                    .primary_key()
                    .autoincrement()],
            ),
            TableDescriptor::new(
                "orders",
                vec![
                    FieldDescriptor::new("id", BaseType::Primitive(ColumnType::Integer))
                        .primary_key()
                        .autoincrement(),
                    FieldDescriptor::new("user_id", BaseType::Primitive(ColumnType::Integer)).foreign_key(
                        crate::types::PostgresForeignKey::new("users", "id"),
                    ),
                ],
            ),
        ];

        let empty = Snapshot::default();
        let next = plan(&tables);
        let rec = MigrationPlanner::build_actions(&empty, &next).unwrap();
        let actions = actions_only(&rec);

        let users_pk_pos = actions
            .iter()
            .position(|a| matches!(a, Action::AddConstraint { table_name, constraint, .. } if table_name == "users" && *constraint == ConstraintType::PrimaryKey))
            .unwrap();
        let fk_pos = actions
            .iter()
            .position(|a| matches!(a, Action::AddConstraint { constraint, .. } if *constraint == ConstraintType::ForeignKey))
            .unwrap();
        assert!(users_pk_pos < fk_pos);
    }

    #[test]
    fn missing_foreign_key_target_is_an_error() {
        let tables = vec![TableDescriptor::new(
            "orders",
            vec![FieldDescriptor::new("user_id", BaseType::Primitive(ColumnType::Integer)).foreign_key(
                crate::types::PostgresForeignKey::new("users", "id"),
            )],
        )];
        let err = MigrationPlanner::order_db_objects(MigrationPlanner::delegate(&tables).unwrap()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedDependency { .. }));
    }

    #[test]
    fn dropped_table_destroys_in_reverse_of_its_creation_order() {
        let tables = vec![TableDescriptor::new(
            "modela",
            vec![FieldDescriptor::new("id", BaseType::Primitive(ColumnType::Integer))
                .primary_key()
                .autoincrement()],
        )];
        let prev = plan(&tables);
        let empty = Snapshot::default();
        let rec = MigrationPlanner::build_actions(&prev, &empty).unwrap();
        let actions = actions_only(&rec);

        let pk_pos = actions.iter().position(|a| matches!(a, Action::DropConstraint { .. })).unwrap();
        let table_pos = actions.iter().position(|a| matches!(a, Action::DropTable { .. })).unwrap();
        assert!(pk_pos < table_pos);
    }

    #[test]
    fn unchanged_schema_produces_no_actions() {
        let tables = vec![TableDescriptor::new(
            "modela",
            vec![FieldDescriptor::new("id", BaseType::Primitive(ColumnType::Integer))
                .primary_key()
                .autoincrement()],
        )];
        let snap = plan(&tables);
        let rec = MigrationPlanner::build_actions(&snap, &snap).unwrap();
        assert!(actions_only(&rec).is_empty());
    }

    #[test]
    fn enum_shared_across_two_tables_merges_referenced_by() {
        let enum_field = |table: &str| {
            FieldDescriptor::new(
                "status",
                BaseType::EnumRef {
                    name: "status_enum".into(),
                    values: vec!["ACTIVE".into(), "INACTIVE".into()],
                },
            )
        };
        let tables = vec![
            TableDescriptor::new("a", vec![enum_field("a")]),
            TableDescriptor::new("b", vec![enum_field("b")]),
        ];
        let snap = plan(&tables);
        match snap.get("status_enum").unwrap() {
            SchemaNode::EnumType(e) => assert_eq!(e.referenced_by.len(), 2),
            _ => panic!("expected enum node"),
        }
    }
}
