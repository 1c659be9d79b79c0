//! Schema Object Model: frozen, value-equal descriptors for tables, columns,
//! enum types and constraints, plus the lightweight pointer variants used
//! only to express ordering dependencies.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::recorder::{ActionRecorder, ConstraintArgs};
use crate::types::{ColumnType, ConstraintType, PostgresForeignKey};

/// A column's declared type: either a concrete `ColumnType`, or a pointer to
/// an `EnumTypeNode` by name. A `ColumnNode` with an `EnumPointer` implies a
/// dependency edge to that `EnumTypeNode`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnTypeRef {
    Concrete(ColumnType),
    EnumPointer(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableNode {
    pub name: String,
}

impl TableNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn representation(&self) -> String {
        self.name.clone()
    }

    pub fn create(&self, rec: &mut ActionRecorder) {
        rec.add_comment(format!("NEW TABLE: {}", self.name), false);
        rec.add_table(self.name.clone());
    }

    pub fn destroy(&self, rec: &mut ActionRecorder) {
        rec.drop_table(self.name.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnNode {
    pub table: String,
    pub name: String,
    pub column_type: ColumnTypeRef,
    pub is_list: bool,
    pub nullable: bool,
    pub autoincrement: bool,
}

impl ColumnNode {
    pub fn representation(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }

    fn type_args(&self) -> (Option<ColumnType>, Option<String>) {
        match &self.column_type {
            ColumnTypeRef::Concrete(t) => {
                let effective = if *t == ColumnType::Integer && self.autoincrement {
                    ColumnType::Serial
                } else {
                    *t
                };
                (Some(effective), None)
            }
            ColumnTypeRef::EnumPointer(name) => (None, Some(name.clone())),
        }
    }

    pub fn create(&self, rec: &mut ActionRecorder) {
        let (explicit, custom) = self.type_args();
        rec.add_column(self.table.clone(), self.name.clone(), explicit, self.is_list, custom);
        if !self.nullable {
            rec.add_not_null(self.table.clone(), self.name.clone());
        }
    }

    pub fn destroy(&self, rec: &mut ActionRecorder) {
        rec.drop_column(self.table.clone(), self.name.clone());
    }

    pub fn migrate(&self, previous: &ColumnNode, rec: &mut ActionRecorder) {
        if self.column_type != previous.column_type || self.is_list != previous.is_list {
            let (explicit, custom) = self.type_args();
            rec.modify_column_type(self.table.clone(), self.name.clone(), explicit, self.is_list, custom);
            rec.add_comment("TODO: Perform a migration of values across types", true);
        }
        if !self.nullable && previous.nullable {
            rec.add_not_null(self.table.clone(), self.name.clone());
        }
        if self.nullable && !previous.nullable {
            rec.drop_not_null(self.table.clone(), self.name.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumTypeNode {
    pub name: String,
    pub values: BTreeSet<String>,
    pub referenced_by: BTreeSet<(String, String)>,
}

impl EnumTypeNode {
    pub fn representation(&self) -> String {
        self.name.clone()
    }

    pub fn create(&self, rec: &mut ActionRecorder) {
        rec.add_type(self.name.clone(), self.values.iter().cloned().collect());
    }

    pub fn destroy(&self, rec: &mut ActionRecorder) {
        rec.drop_type(self.name.clone());
    }

    pub fn migrate(&self, previous: &EnumTypeNode, rec: &mut ActionRecorder) {
        let new_values: Vec<String> = self.values.difference(&previous.values).cloned().collect();
        let deleted_values: Vec<String> = previous.values.difference(&self.values).cloned().collect();
        if !new_values.is_empty() {
            rec.add_type_values(self.name.clone(), new_values, None);
        }
        if !deleted_values.is_empty() {
            let referencing: Vec<(String, String)> = self.referenced_by.iter().cloned().collect();
            rec.drop_type_values(self.name.clone(), deleted_values, Some(referencing));
        }
    }

    /// Requires identical `name` and `values`; unions `referenced_by`.
    /// Commutative, since set union is commutative.
    pub fn merge(&self, other: &EnumTypeNode) -> Result<EnumTypeNode> {
        if self.name != other.name || self.values != other.values {
            return Err(Error::merge_conflict(
                self.representation(),
                format!(
                    "cannot merge enum type with different values: {}({:?}) != {}({:?})",
                    self.name, self.values, other.name, other.values
                ),
            ));
        }
        Ok(EnumTypeNode {
            name: self.name.clone(),
            values: self.values.clone(),
            referenced_by: self.referenced_by.union(&other.referenced_by).cloned().collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ConstraintNode {
    pub table: String,
    pub columns: BTreeSet<String>,
    pub kind: ConstraintType,
    /// Deterministically derived from `(table, columns, kind)`; excluded
    /// from content equality so renaming never counts as a content change.
    pub constraint_name: String,
    pub fk_spec: Option<PostgresForeignKey>,
    pub check_spec: Option<String>,
}

impl PartialEq for ConstraintNode {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
            && self.columns == other.columns
            && self.kind == other.kind
            && self.fk_spec == other.fk_spec
            && self.check_spec == other.check_spec
    }
}
impl Eq for ConstraintNode {}

impl std::hash::Hash for ConstraintNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        for c in &self.columns {
            c.hash(state);
        }
        self.kind.hash(state);
        self.check_spec.hash(state);
    }
}

impl ConstraintNode {
    pub fn new(
        table: impl Into<String>,
        columns: BTreeSet<String>,
        kind: ConstraintType,
        fk_spec: Option<PostgresForeignKey>,
        check_spec: Option<String>,
    ) -> Result<Self> {
        let table = table.into();
        let constraint_name = Self::new_constraint_name(&table, &columns, kind);
        let node = Self {
            table,
            columns,
            kind,
            constraint_name,
            fk_spec,
            check_spec,
        };
        node.validate()?;
        Ok(node)
    }

    fn validate(&self) -> Result<()> {
        let is_fk = self.kind == ConstraintType::ForeignKey;
        if is_fk != self.fk_spec.is_some() {
            return Err(Error::constraint_inconsistency(
                self.representation(),
                "FOREIGN_KEY constraints must carry fk_spec, and only FOREIGN_KEY constraints may",
            ));
        }
        Ok(())
    }

    pub fn new_constraint_name(table: &str, columns: &BTreeSet<String>, kind: ConstraintType) -> String {
        let cols = columns.iter().cloned().collect::<Vec<_>>().join("_");
        match kind {
            ConstraintType::PrimaryKey => format!("{}_pkey", table),
            ConstraintType::ForeignKey => format!("{}_{}_fkey", table, cols),
            ConstraintType::Unique => format!("{}_{}_unique", table, cols),
            ConstraintType::Index => format!("{}_{}_idx", table, cols),
            ConstraintType::Check => format!("{}_{}_key", table, cols),
        }
    }

    pub fn representation(&self) -> String {
        constraint_representation(&self.table, &self.columns, self.kind)
    }

    fn columns_vec(&self) -> Vec<String> {
        self.columns.iter().cloned().collect()
    }

    pub fn create(&self, rec: &mut ActionRecorder) {
        match self.kind {
            ConstraintType::ForeignKey => rec.add_constraint(
                self.table.clone(),
                self.kind,
                self.constraint_name.clone(),
                self.columns_vec(),
                self.fk_spec.clone().map(ConstraintArgs::ForeignKey),
            ),
            ConstraintType::Check => rec.add_constraint(
                self.table.clone(),
                self.kind,
                self.constraint_name.clone(),
                self.columns_vec(),
                self.check_spec.clone().map(ConstraintArgs::Check),
            ),
            ConstraintType::Index => {
                rec.add_index(self.table.clone(), Some(self.columns_vec()), self.constraint_name.clone())
            }
            ConstraintType::PrimaryKey | ConstraintType::Unique => rec.add_constraint(
                self.table.clone(),
                self.kind,
                self.constraint_name.clone(),
                self.columns_vec(),
                None,
            ),
        }
    }

    pub fn destroy(&self, rec: &mut ActionRecorder) {
        match self.kind {
            ConstraintType::Index => rec.drop_index(self.table.clone(), self.constraint_name.clone()),
            _ => rec.drop_constraint(self.table.clone(), self.constraint_name.clone()),
        }
    }

    /// Constraints never patch in place: any content difference destroys and
    /// recreates.
    pub fn migrate(&self, previous: &ConstraintNode, rec: &mut ActionRecorder) -> Result<()> {
        if self.kind != previous.kind {
            return Err(Error::internal(
                format!("constraint kind changed for {} without a representation change", self.representation()),
                Some("ConstraintNode::migrate".to_string()),
            ));
        }
        if self != previous {
            previous.destroy(rec);
            self.create(rec);
        }
        Ok(())
    }
}

pub fn constraint_representation(table: &str, columns: &BTreeSet<String>, kind: ConstraintType) -> String {
    let cols = columns.iter().cloned().collect::<Vec<_>>().join(",");
    format!("{}.[{}].{}", table, cols, kind)
}

/// The four schema object kinds, unified so the planner can carry
/// heterogeneous nodes through one ordering and diff pass.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Table(TableNode),
    Column(ColumnNode),
    EnumType(EnumTypeNode),
    Constraint(ConstraintNode),
}

/// Tie-break preference among nodes whose dependencies are all satisfied:
/// tables first, then columns and types together (their relative order
/// comes from which became ready earlier, see `planner::order_db_objects`),
/// then constraints/indexes last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tier(u8);

impl SchemaNode {
    pub fn representation(&self) -> String {
        match self {
            SchemaNode::Table(n) => n.representation(),
            SchemaNode::Column(n) => n.representation(),
            SchemaNode::EnumType(n) => n.representation(),
            SchemaNode::Constraint(n) => n.representation(),
        }
    }

    pub fn tier(&self) -> Tier {
        Tier(match self {
            SchemaNode::Table(_) => 0,
            SchemaNode::Column(_) => 1,
            SchemaNode::EnumType(_) => 1,
            SchemaNode::Constraint(_) => 2,
        })
    }

    pub fn create(&self, rec: &mut ActionRecorder) {
        match self {
            SchemaNode::Table(n) => n.create(rec),
            SchemaNode::Column(n) => n.create(rec),
            SchemaNode::EnumType(n) => n.create(rec),
            SchemaNode::Constraint(n) => n.create(rec),
        }
    }

    pub fn destroy(&self, rec: &mut ActionRecorder) {
        match self {
            SchemaNode::Table(n) => n.destroy(rec),
            SchemaNode::Column(n) => n.destroy(rec),
            SchemaNode::EnumType(n) => n.destroy(rec),
            SchemaNode::Constraint(n) => n.destroy(rec),
        }
    }

    pub fn migrate(&self, previous: &SchemaNode, rec: &mut ActionRecorder) -> Result<()> {
        match (self, previous) {
            (SchemaNode::Table(_), SchemaNode::Table(_)) => Ok(()),
            (SchemaNode::Column(n), SchemaNode::Column(p)) => {
                n.migrate(p, rec);
                Ok(())
            }
            (SchemaNode::EnumType(n), SchemaNode::EnumType(p)) => {
                n.migrate(p, rec);
                Ok(())
            }
            (SchemaNode::Constraint(n), SchemaNode::Constraint(p)) => n.migrate(p, rec),
            _ => Err(Error::internal(
                format!("representation key collision across node kinds: {}", self.representation()),
                Some("SchemaNode::migrate".to_string()),
            )),
        }
    }

    /// Default merge requires byte-equal content; `EnumType` overrides to
    /// union `referenced_by`.
    pub fn merge(&self, other: &SchemaNode) -> Result<SchemaNode> {
        match (self, other) {
            (SchemaNode::EnumType(a), SchemaNode::EnumType(b)) => Ok(SchemaNode::EnumType(a.merge(b)?)),
            (a, b) if a == b => Ok(a.clone()),
            (a, b) => Err(Error::merge_conflict(
                a.representation(),
                format!("conflicting definitions for {}\n{:?} != {:?}", a.representation(), a, b),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::recorder::Entry;

    #[test]
    fn table_create_emits_banner_then_add_table() {
        let mut rec = ActionRecorder::new();
        TableNode::new("modela").create(&mut rec);
        assert_eq!(rec.entries.len(), 2);
        assert!(matches!(&rec.entries[0], Entry::Comment { text, .. } if text == "NEW TABLE: modela"));
        assert!(matches!(&rec.entries[1], Entry::Action(crate::schema::recorder::Action::AddTable { table_name }) if table_name == "modela"));
    }

    #[test]
    fn column_create_uses_serial_for_autoincrement_integer() {
        let col = ColumnNode {
            table: "modela".into(),
            name: "id".into(),
            column_type: ColumnTypeRef::Concrete(ColumnType::Integer),
            is_list: false,
            nullable: false,
            autoincrement: true,
        };
        let mut rec = ActionRecorder::new();
        col.create(&mut rec);
        match &rec.entries[0] {
            Entry::Action(crate::schema::recorder::Action::AddColumn { explicit_data_type, .. }) => {
                assert_eq!(*explicit_data_type, Some(ColumnType::Serial));
            }
            _ => panic!("expected add_column"),
        }
    }

    #[test]
    fn enum_merge_unions_referenced_by_and_is_commutative() {
        let a = EnumTypeNode {
            name: "oldvalues".into(),
            values: BTreeSet::from(["A".to_string()]),
            referenced_by: BTreeSet::from([("t1".to_string(), "c1".to_string())]),
        };
        let b = EnumTypeNode {
            name: "oldvalues".into(),
            values: BTreeSet::from(["A".to_string()]),
            referenced_by: BTreeSet::from([("t2".to_string(), "c2".to_string())]),
        };
        let merged_ab = a.merge(&b).unwrap();
        let merged_ba = b.merge(&a).unwrap();
        assert_eq!(merged_ab.referenced_by, merged_ba.referenced_by);
        assert_eq!(merged_ab.referenced_by.len(), 2);
    }

    #[test]
    fn enum_merge_rejects_differing_values() {
        let a = EnumTypeNode {
            name: "e".into(),
            values: BTreeSet::from(["A".to_string()]),
            referenced_by: BTreeSet::new(),
        };
        let b = EnumTypeNode {
            name: "e".into(),
            values: BTreeSet::from(["A".to_string(), "B".to_string()]),
            referenced_by: BTreeSet::new(),
        };
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn foreign_key_constraint_requires_fk_spec() {
        let err = ConstraintNode::new(
            "orders",
            BTreeSet::from(["user_id".to_string()]),
            ConstraintType::ForeignKey,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConstraintInconsistency { .. }));
    }

    #[test]
    fn constraint_name_follows_convention_per_kind() {
        let cols = BTreeSet::from(["id".to_string()]);
        assert_eq!(
            ConstraintNode::new_constraint_name("modela", &cols, ConstraintType::PrimaryKey),
            "modela_pkey"
        );
        assert_eq!(
            ConstraintNode::new_constraint_name("modela", &cols, ConstraintType::Unique),
            "modela_id_unique"
        );
        assert_eq!(
            ConstraintNode::new_constraint_name("modela", &cols, ConstraintType::Index),
            "modela_id_idx"
        );
    }
}
