//! Schema model for generated MySQL dumps.
//!
//! Tables are rendered in mysqldump's style: backtick-quoted names,
//! display widths, `ENGINE=` table options and inline KEY definitions.

use std::collections::HashMap;

/// MySQL column types used by the generator
#[derive(Debug, Clone, PartialEq)]
pub enum SqlType {
    /// `int(11) NOT NULL AUTO_INCREMENT`
    AutoIncrement,
    /// `bigint(20) NOT NULL AUTO_INCREMENT`
    BigAutoIncrement,
    Int,
    IntUnsigned,
    BigInt,
    TinyBool,
    VarChar(u16),
    Text,
    LongText,
    Decimal(u8, u8),
    Double,
    DateTime,
    Timestamp,
    Date,
    Json,
    Blob,
    Enum(Vec<String>),
}

impl SqlType {
    pub fn to_mysql(&self) -> String {
        match self {
            SqlType::AutoIncrement => "int(11)".to_string(),
            SqlType::BigAutoIncrement => "bigint(20)".to_string(),
            SqlType::Int => "int(11)".to_string(),
            SqlType::IntUnsigned => "int(10) unsigned".to_string(),
            SqlType::BigInt => "bigint(20)".to_string(),
            SqlType::TinyBool => "tinyint(1)".to_string(),
            SqlType::VarChar(n) => format!("varchar({})", n),
            SqlType::Text => "text".to_string(),
            SqlType::LongText => "longtext".to_string(),
            SqlType::Decimal(p, s) => format!("decimal({},{})", p, s),
            SqlType::Double => "double".to_string(),
            SqlType::DateTime => "datetime".to_string(),
            SqlType::Timestamp => "timestamp".to_string(),
            SqlType::Date => "date".to_string(),
            SqlType::Json => "json".to_string(),
            SqlType::Blob => "blob".to_string(),
            SqlType::Enum(values) => {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
                format!("enum({})", quoted.join(","))
            }
        }
    }

    pub fn is_auto_increment(&self) -> bool {
        matches!(self, SqlType::AutoIncrement | SqlType::BigAutoIncrement)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            SqlType::AutoIncrement
                | SqlType::BigAutoIncrement
                | SqlType::Int
                | SqlType::IntUnsigned
                | SqlType::BigInt
                | SqlType::TinyBool
        )
    }
}

/// Foreign key reference action
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FkAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    Restrict,
}

impl FkAction {
    pub fn to_sql(&self) -> &'static str {
        match self {
            FkAction::NoAction => "NO ACTION",
            FkAction::Cascade => "CASCADE",
            FkAction::SetNull => "SET NULL",
            FkAction::Restrict => "RESTRICT",
        }
    }
}

/// Foreign key constraint
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub name: String,
    pub column: String,
    pub to_table: String,
    pub to_column: String,
    pub on_delete: FkAction,
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
    pub not_null: bool,
    pub default: Option<String>,
    pub on_update_now: bool,
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            not_null: false,
            default: None,
            on_update_now: false,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn on_update_now(mut self) -> Self {
        self.on_update_now = true;
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comment = Some(text.into());
        self
    }

    pub fn to_mysql(&self) -> String {
        let mut out = format!("`{}` {}", self.name, self.sql_type.to_mysql());
        if self.not_null || self.sql_type.is_auto_increment() {
            out.push_str(" NOT NULL");
        }
        if self.sql_type.is_auto_increment() {
            out.push_str(" AUTO_INCREMENT");
        } else if let Some(default) = &self.default {
            out.push_str(" DEFAULT ");
            out.push_str(default);
        } else if !self.not_null {
            out.push_str(" DEFAULT NULL");
        }
        if self.on_update_now {
            out.push_str(" ON UPDATE CURRENT_TIMESTAMP");
        }
        if let Some(comment) = &self.comment {
            out.push_str(&format!(" COMMENT '{}'", comment.replace('\'', "''")));
        }
        out
    }
}

/// Secondary index kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexKind {
    Plain,
    Unique,
    Fulltext,
}

/// Secondary index definition
#[derive(Debug, Clone)]
pub struct Index {
    pub name: String,
    pub kind: IndexKind,
    pub columns: Vec<String>,
}

/// Table definition
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, col: Column) -> Self {
        self.columns.push(col);
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key.push(column.into());
        self
    }

    pub fn index(mut self, name: impl Into<String>, kind: IndexKind, columns: &[&str]) -> Self {
        self.indexes.push(Index {
            name: name.into(),
            kind,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn references(
        mut self,
        column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
        on_delete: FkAction,
    ) -> Self {
        let column = column.into();
        let name = format!("fk_{}_{}", self.name, column).replace(' ', "_");
        self.foreign_keys.push(ForeignKey {
            name,
            column,
            to_table: to_table.into(),
            to_column: to_column.into(),
            on_delete,
        });
        self
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// The CREATE TABLE statement as mysqldump writes it
    pub fn to_mysql(&self) -> String {
        let mut lines: Vec<String> = self.columns.iter().map(|c| c.to_mysql()).collect();

        if !self.primary_key.is_empty() {
            lines.push(format!("PRIMARY KEY ({})", backtick_list(&self.primary_key)));
        }
        for index in &self.indexes {
            let keyword = match index.kind {
                IndexKind::Plain => "KEY",
                IndexKind::Unique => "UNIQUE KEY",
                IndexKind::Fulltext => "FULLTEXT KEY",
            };
            lines.push(format!(
                "{} `{}` ({})",
                keyword,
                index.name,
                backtick_list(&index.columns)
            ));
        }
        for fk in &self.foreign_keys {
            let mut line = format!(
                "CONSTRAINT `{}` FOREIGN KEY (`{}`) REFERENCES `{}` (`{}`)",
                fk.name, fk.column, fk.to_table, fk.to_column
            );
            if fk.on_delete != FkAction::NoAction {
                line.push_str(" ON DELETE ");
                line.push_str(fk.on_delete.to_sql());
            }
            lines.push(line);
        }

        format!(
            "CREATE TABLE `{}` (\n  {}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;",
            self.name,
            lines.join(",\n  ")
        )
    }
}

fn backtick_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("`{}`", c))
        .collect::<Vec<_>>()
        .join(",")
}

/// Complete schema definition, tables kept in dump order
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub tables: Vec<Table>,
    table_index: HashMap<String, usize>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: Table) -> Self {
        self.table_index.insert(table.name.clone(), self.tables.len());
        self.tables.push(table);
        self
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.table_index.get(name).map(|&idx| &self.tables[idx])
    }

    /// Position of a table in dump order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.table_index.get(name).copied()
    }

    /// Foreign keys whose referenced table is dumped after the owner
    pub fn forward_references(&self) -> Vec<(&str, &ForeignKey)> {
        self.tables
            .iter()
            .enumerate()
            .flat_map(|(idx, table)| {
                table
                    .foreign_keys
                    .iter()
                    .filter(move |fk| self.position(&fk.to_table).is_some_and(|to| to > idx))
                    .map(move |fk| (table.name.as_str(), fk))
            })
            .collect()
    }

    /// A small shop schema in alphabetical dump order, as mysqldump writes
    /// it. `order_items` and `orders` reference tables dumped later, and a
    /// few names need quoting in PostgreSQL.
    pub fn shop() -> Self {
        Schema::new()
            .table(
                Table::new("order_items")
                    .column(Column::new("id", SqlType::BigAutoIncrement))
                    .column(Column::new("order_id", SqlType::BigInt).not_null())
                    .column(Column::new("product_id", SqlType::Int).not_null())
                    .column(Column::new("quantity", SqlType::IntUnsigned).not_null().default("'1'"))
                    .column(Column::new("unit price", SqlType::Decimal(10, 2)).not_null())
                    .primary_key("id")
                    .index("idx_order", IndexKind::Plain, &["order_id"])
                    .references("order_id", "orders", "id", FkAction::Cascade)
                    .references("product_id", "products", "id", FkAction::Restrict),
            )
            .table(
                Table::new("orders")
                    .column(Column::new("id", SqlType::BigAutoIncrement))
                    .column(Column::new("user", SqlType::Int).not_null())
                    .column(Column::new(
                        "status",
                        SqlType::Enum(vec!["new".into(), "paid".into(), "shipped".into()]),
                    ).not_null().default("'new'"))
                    .column(Column::new("Order Notes", SqlType::Text))
                    .column(
                        Column::new("created_at", SqlType::Timestamp)
                            .not_null()
                            .default("CURRENT_TIMESTAMP"),
                    )
                    .column(
                        Column::new("updated_at", SqlType::Timestamp)
                            .not_null()
                            .default("CURRENT_TIMESTAMP")
                            .on_update_now(),
                    )
                    .primary_key("id")
                    .index("idx_user", IndexKind::Plain, &["user"])
                    .references("user", "users", "id", FkAction::NoAction),
            )
            .table(
                Table::new("products")
                    .column(Column::new("id", SqlType::AutoIncrement))
                    .column(Column::new("sku", SqlType::VarChar(32)).not_null())
                    .column(Column::new("name", SqlType::VarChar(255)).not_null())
                    .column(Column::new("description", SqlType::LongText))
                    .column(Column::new("price", SqlType::Decimal(10, 2)).not_null().default("'0.00'"))
                    .column(Column::new("active", SqlType::TinyBool).not_null().default("'1'"))
                    .column(Column::new("attributes", SqlType::Json))
                    .primary_key("id")
                    .index("sku", IndexKind::Unique, &["sku"])
                    .index("ft_description", IndexKind::Fulltext, &["description"]),
            )
            .table(
                Table::new("users")
                    .column(Column::new("id", SqlType::AutoIncrement))
                    .column(Column::new("email", SqlType::VarChar(191)).not_null())
                    .column(Column::new("display name", SqlType::VarChar(100)).comment("shown in the UI"))
                    .column(Column::new("is_admin", SqlType::TinyBool).not_null().default("'0'"))
                    .column(Column::new("birth_date", SqlType::Date))
                    .column(Column::new("last_login", SqlType::DateTime))
                    .column(Column::new("avatar", SqlType::Blob))
                    .primary_key("id")
                    .index("email", IndexKind::Unique, &["email"]),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_rendering() {
        let col = Column::new("id", SqlType::BigAutoIncrement);
        assert_eq!(col.to_mysql(), "`id` bigint(20) NOT NULL AUTO_INCREMENT");

        let col = Column::new("note", SqlType::VarChar(20));
        assert_eq!(col.to_mysql(), "`note` varchar(20) DEFAULT NULL");
    }

    #[test]
    fn test_shop_has_forward_references() {
        let schema = Schema::shop();
        let forward: Vec<_> = schema
            .forward_references()
            .into_iter()
            .map(|(owner, fk)| (owner, fk.to_table.as_str()))
            .collect();
        assert!(forward.contains(&("order_items", "orders")));
        assert!(forward.contains(&("orders", "users")));
    }

    #[test]
    fn test_create_table_shape() {
        let schema = Schema::shop();
        let sql = schema.get_table("orders").unwrap().to_mysql();
        assert!(sql.starts_with("CREATE TABLE `orders` (\n  `id` bigint(20)"));
        assert!(sql.contains("`Order Notes` text DEFAULT NULL"));
        assert!(sql.contains("CONSTRAINT `fk_orders_user` FOREIGN KEY (`user`) REFERENCES `users` (`id`)"));
        assert!(sql.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;"));
    }
}
