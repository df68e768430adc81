//! Foreign key deferral.
//!
//! Every foreign key leaves its CREATE TABLE and becomes a standalone
//! `ALTER TABLE ... ADD CONSTRAINT` emitted after all tables exist, so the
//! output never depends on table order.

use crate::convert::{ConvertWarning, WarningCollector};
use crate::schema::{
    ColumnDefinition, Constraint, DataType, DeferredForeignKey, ForeignKey, QualifiedName,
    TableBlock,
};
use ahash::{AHashMap, AHashSet};

/// Collects deferred foreign keys in source order.
pub struct DeferralPlanner {
    deferred: Vec<DeferredForeignKey>,
    /// Columns added to existing tables by ALTER TABLE, keyed by table.
    added_columns: AHashMap<String, AHashSet<String>>,
    add_missing_columns: bool,
}

impl Default for DeferralPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferralPlanner {
    pub fn new() -> Self {
        Self {
            deferred: Vec::new(),
            added_columns: AHashMap::new(),
            add_missing_columns: false,
        }
    }

    /// Append FK columns a table never declares, as `BIGINT`.
    pub fn with_missing_column_repair(mut self, enabled: bool) -> Self {
        self.add_missing_columns = enabled;
        self
    }

    /// Move every foreign key out of `table`.
    pub fn defer_table(&mut self, table: &mut TableBlock) {
        let owner = table.name.clone();
        let mut kept = Vec::with_capacity(table.constraints.len());

        for constraint in table.constraints.drain(..) {
            match constraint {
                Constraint::ForeignKey(fk) => self.deferred.push(DeferredForeignKey {
                    owner: owner.clone(),
                    foreign_key: fk,
                }),
                other => kept.push(other),
            }
        }
        table.constraints = kept;
    }

    /// Defer a foreign key declared outside CREATE TABLE.
    pub fn defer(&mut self, owner: QualifiedName, foreign_key: ForeignKey) {
        self.deferred.push(DeferredForeignKey { owner, foreign_key });
    }

    /// Record a column added by `ALTER TABLE ... ADD COLUMN`.
    pub fn note_added_column(&mut self, table: &QualifiedName, column: &str) {
        self.added_columns
            .entry(table.key())
            .or_default()
            .insert(column.to_lowercase());
    }

    pub fn deferred(&self) -> &[DeferredForeignKey] {
        &self.deferred
    }

    /// Check referential closure against the tables of this batch and run the
    /// optional column repair. Unresolved references are reported, never
    /// dropped.
    ///
    /// Tables are matched by name alone ([`QualifiedName::key`]), so
    /// `REFERENCES otherdb.t` counts as resolved when any table `t` is
    /// created in the batch. That matches `--schema`, which moves every
    /// table into one schema. Without it a source database qualifier is kept
    /// in the output and the reference is only as good as that database.
    pub fn finish(
        self,
        tables: &mut [&mut TableBlock],
        warnings: &mut WarningCollector,
    ) -> Vec<DeferredForeignKey> {
        let created: AHashSet<String> = tables.iter().map(|t| t.name.key()).collect();

        for deferred in &self.deferred {
            let fk = &deferred.foreign_key;
            if !created.contains(&fk.referenced_table.key()) {
                warnings.add(ConvertWarning::UnresolvedReference {
                    constraint: fk.name.name().to_string(),
                    table: deferred.owner.name.name().to_string(),
                    referenced_table: fk.referenced_table.name.name().to_string(),
                });
            }

            if !self.add_missing_columns {
                continue;
            }
            let owner_key = deferred.owner.key();
            let Some(table) = tables.iter_mut().find(|t| t.name.key() == owner_key) else {
                continue;
            };
            for column in &fk.columns {
                let added = self
                    .added_columns
                    .get(&owner_key)
                    .is_some_and(|cols| cols.contains(&column.key()));
                if table.column(column.name()).is_some() || added {
                    continue;
                }
                table.columns.push(ColumnDefinition::new(
                    column.name(),
                    DataType::named("BIGINT"),
                ));
                warnings.add(ConvertWarning::RepairedColumn {
                    table: table.name.name.name().to_string(),
                    column: column.name().to_string(),
                });
            }
        }

        self.deferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Extractor;

    fn table(sql: &str) -> TableBlock {
        let mut warnings = WarningCollector::new();
        Extractor::new(&mut warnings).create_table(sql).unwrap()
    }

    #[test]
    fn test_foreign_keys_leave_their_table() {
        let mut orders = table(
            "CREATE TABLE orders (id int, customer_id int, PRIMARY KEY (id), CONSTRAINT fk_c FOREIGN KEY (customer_id) REFERENCES customers (id))",
        );
        let mut customers = table("CREATE TABLE customers (id int)");

        let mut planner = DeferralPlanner::new();
        planner.defer_table(&mut orders);
        planner.defer_table(&mut customers);
        assert_eq!(orders.foreign_keys().count(), 0);
        assert_eq!(orders.constraints.len(), 1);

        let mut warnings = WarningCollector::new();
        let deferred = planner.finish(&mut [&mut orders, &mut customers], &mut warnings);
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].owner.name.name(), "orders");
        assert!(!warnings.has_warnings());
    }

    #[test]
    fn test_unresolved_reference_is_reported() {
        let mut t = table("CREATE TABLE t (a int, FOREIGN KEY (a) REFERENCES elsewhere (id))");
        let mut planner = DeferralPlanner::new();
        planner.defer_table(&mut t);

        let mut warnings = WarningCollector::new();
        let deferred = planner.finish(&mut [&mut t], &mut warnings);
        assert_eq!(deferred.len(), 1);
        assert!(matches!(
            &warnings.warnings()[0],
            ConvertWarning::UnresolvedReference { referenced_table, .. } if referenced_table == "elsewhere"
        ));
    }

    #[test]
    fn test_qualified_reference_resolves_by_table_name() {
        let mut orders = table(
            "CREATE TABLE orders (id int, customer_id int, FOREIGN KEY (customer_id) REFERENCES shop.customers (id))",
        );
        let mut customers = table("CREATE TABLE customers (id int)");
        let mut planner = DeferralPlanner::new();
        planner.defer_table(&mut orders);

        let mut warnings = WarningCollector::new();
        let deferred = planner.finish(&mut [&mut orders, &mut customers], &mut warnings);
        assert_eq!(deferred.len(), 1);
        assert!(!warnings.has_warnings());
    }

    #[test]
    fn test_missing_column_repair() {
        let mut t = table("CREATE TABLE t (id int)");
        let mut planner = DeferralPlanner::new().with_missing_column_repair(true);
        planner.defer(
            t.name.clone(),
            ForeignKey {
                name: crate::schema::Identifier::new("fk"),
                columns: std::iter::once(crate::schema::Identifier::new("owner_id")).collect(),
                referenced_table: QualifiedName::unqualified("t"),
                referenced_columns: std::iter::once(crate::schema::Identifier::new("id")).collect(),
                actions: Vec::new(),
            },
        );

        let mut warnings = WarningCollector::new();
        planner.finish(&mut [&mut t], &mut warnings);
        let added = t.column("owner_id").unwrap();
        assert_eq!(added.data_type.to_string(), "BIGINT");
        assert_eq!(warnings.count(), 1);
    }

    #[test]
    fn test_repair_respects_altered_columns() {
        let mut t = table("CREATE TABLE t (id int, FOREIGN KEY (parent_id) REFERENCES t (id))");
        let mut planner = DeferralPlanner::new().with_missing_column_repair(true);
        planner.defer_table(&mut t);
        planner.note_added_column(&t.name, "Parent_Id");

        let mut warnings = WarningCollector::new();
        planner.finish(&mut [&mut t], &mut warnings);
        assert_eq!(t.columns.len(), 1);
    }
}
