//! End-to-end conversion tests through the library API.

use ddl_convert::convert::{
    self, ConvertConfig, ConvertError, ConvertOptions, ConvertOutput, ConvertWarning, Converter,
};
use ddl_convert::input::TextEncoding;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

const MYSQL_DUMP: &str = r#"-- MySQL dump 10.13  Distrib 8.0.36, for Linux (x86_64)
--
-- Host: localhost    Database: shop
-- ------------------------------------------------------

/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;
/*!50503 SET NAMES utf8mb4 */;
/*!40014 SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0 */;
SET NAMES utf8mb4;
USE `shop`;

--
-- Table structure for table `orders`
--

DROP TABLE IF EXISTS `orders`;
CREATE TABLE `orders` (
  `id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,
  `customer_id` int(11) NOT NULL,
  `paid` tinyint(1) NOT NULL DEFAULT '0',
  `Order Notes` longtext COLLATE utf8mb4_unicode_ci,
  `created_at` datetime NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
  PRIMARY KEY (`id`),
  KEY `idx_customer` (`customer_id`),
  CONSTRAINT `fk_orders_customer` FOREIGN KEY (`customer_id`) REFERENCES `customers` (`id`) ON DELETE CASCADE
) ENGINE=InnoDB AUTO_INCREMENT=1001 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;

LOCK TABLES `orders` WRITE;
/*!40000 ALTER TABLE `orders` DISABLE KEYS */;
INSERT INTO `orders` VALUES (1,1,1,'first; order','2024-01-01 10:00:00'),(2,1,0,NULL,'2024-01-02 11:00:00');
/*!40000 ALTER TABLE `orders` ENABLE KEYS */;
UNLOCK TABLES;

--
-- Table structure for table `customers`
--

DROP TABLE IF EXISTS `customers`;
CREATE TABLE `customers` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `email` varchar(191) NOT NULL,
  `user` varchar(50) DEFAULT NULL COMMENT 'login name',
  PRIMARY KEY (`id`),
  UNIQUE KEY `uniq_email` (`email`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;

INSERT INTO `customers` VALUES (1,'a@example.com','alice');
/*!40014 SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS */;
"#;

fn convert(sql: &str) -> ConvertOutput {
    Converter::new(ConvertOptions::default()).convert(sql)
}

fn convert_without_header(sql: &str) -> ConvertOutput {
    Converter::new(ConvertOptions {
        header: false,
        ..Default::default()
    })
    .convert(sql)
}

/// The CREATE TABLE statements of a script, one string each.
fn create_tables(sql: &str) -> Vec<&str> {
    sql.split("CREATE TABLE")
        .skip(1)
        .map(|rest| rest.split(");").next().unwrap_or(rest))
        .collect()
}

#[test]
fn test_client_table_example() {
    let out = convert(
        "CREATE TABLE `m_client` (`id` bigint(20) NOT NULL AUTO_INCREMENT, KEY `idx1` (`id`)) ENGINE=InnoDB;",
    );
    assert!(out.sql.starts_with("-- Converted by ddl-convert"));
    assert!(out.sql.contains("CREATE TABLE IF NOT EXISTS m_client (\n  id BIGSERIAL\n);"));
    assert!(!out.sql.contains("ENGINE"));
    assert!(out.sql.contains("CREATE INDEX IF NOT EXISTS idx1 ON m_client(id);"));
    assert_eq!(
        out.index_statements,
        vec!["CREATE INDEX IF NOT EXISTS idx1 ON m_client(id);"]
    );
}

#[test]
fn test_full_dump_noise_is_removed() {
    let out = convert(MYSQL_DUMP);
    for noise in [
        "INSERT INTO",
        "LOCK TABLES",
        "/*!",
        "SET NAMES",
        "USE ",
        "ENGINE",
        "CHARSET",
        "COLLATE",
        "AUTO_INCREMENT",
        "COMMENT",
        "ON UPDATE",
        "unsigned",
    ] {
        assert!(!out.sql.contains(noise), "{noise:?} survived:\n{}", out.sql);
    }
    // Only the dump's own comments may still mention backticked names.
    for line in out.sql.lines().filter(|l| !l.starts_with("--")) {
        assert!(!line.contains('`'), "{line}");
    }
}

#[test]
fn test_full_dump_structure() {
    let out = convert(MYSQL_DUMP);
    let sql = &out.sql;

    assert!(sql.contains("DROP TABLE IF EXISTS orders;"));
    assert!(sql.contains("  id BIGSERIAL,\n"));
    assert!(sql.contains("  customer_id INTEGER NOT NULL,\n"));
    assert!(sql.contains("  paid BOOLEAN NOT NULL DEFAULT FALSE,\n"));
    assert!(sql.contains("  \"Order Notes\" TEXT,\n"));
    assert!(sql.contains("  created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,\n"));
    assert!(sql.contains("  \"user\" varchar(50) DEFAULT NULL,\n"));
    assert!(sql.contains("CREATE INDEX IF NOT EXISTS idx_customer ON orders(customer_id);"));
    assert_eq!(
        out.foreign_key_statements,
        vec![
            "ALTER TABLE orders ADD CONSTRAINT fk_orders_customer FOREIGN KEY (customer_id) REFERENCES customers (id) ON DELETE CASCADE;"
        ]
    );

    assert_eq!(out.stats.tables, 2);
    assert_eq!(out.stats.indexes, 1);
    assert_eq!(out.stats.foreign_keys, 1);
    assert_eq!(out.stats.passed_through, 0);
}

#[test]
fn test_no_create_table_contains_a_foreign_key() {
    let out = convert(MYSQL_DUMP);
    for table in create_tables(&out.sql) {
        assert!(!table.contains("FOREIGN KEY"), "{table}");
        assert!(!table.contains("REFERENCES"), "{table}");
    }
}

#[test]
fn test_foreign_keys_follow_every_table() {
    let out = convert(MYSQL_DUMP);
    let last_create = out.sql.rfind("CREATE TABLE").unwrap();
    for statement in &out.foreign_key_statements {
        let pos = out.sql.find(statement.as_str()).unwrap();
        assert!(pos > last_create);
    }
}

#[test]
fn test_named_forward_reference() {
    let out = convert_without_header(
        "CREATE TABLE `child` (\n  `id` int NOT NULL,\n  `parent_id` int DEFAULT NULL,\n  CONSTRAINT `fk_parent` FOREIGN KEY (`parent_id`) REFERENCES `parent` (`id`)\n);\nCREATE TABLE `parent` (`id` int NOT NULL);\n",
    );
    let create_child = out.sql.find("CREATE TABLE IF NOT EXISTS child").unwrap();
    let create_parent = out.sql.find("CREATE TABLE IF NOT EXISTS parent").unwrap();
    let alter = out
        .sql
        .find("ALTER TABLE child ADD CONSTRAINT fk_parent FOREIGN KEY (parent_id) REFERENCES parent (id);")
        .unwrap();
    assert!(alter > create_child && alter > create_parent);
    assert_eq!(out.sql.matches("fk_parent").count(), 1);
    assert!(out.warnings.is_empty());
}

#[test]
fn test_spaced_column_is_quoted_everywhere() {
    let out = convert_without_header(
        "CREATE TABLE `loans` (\n  `id` int NOT NULL,\n  `Start Date` datetime DEFAULT NULL,\n  KEY `idx_start` (`Start Date`),\n  CONSTRAINT `fk_start` FOREIGN KEY (`Start Date`) REFERENCES `calendar` (`day`)\n);\nCREATE TABLE `calendar` (`day` datetime NOT NULL);\n",
    );
    assert!(out.sql.contains("  \"Start Date\" TIMESTAMP DEFAULT NULL"));
    assert!(out.sql.contains("ON loans(\"Start Date\");"));
    assert!(out.sql.contains("FOREIGN KEY (\"Start Date\") REFERENCES calendar (day);"));
    assert!(!out.sql.contains(" Start Date "));
}

#[test]
fn test_unresolved_reference_is_kept_and_reported() {
    let out = convert_without_header(
        "CREATE TABLE t (id int, other_id int, CONSTRAINT fk_other FOREIGN KEY (other_id) REFERENCES other (id));",
    );
    assert_eq!(out.foreign_key_statements.len(), 1);
    assert!(out.warnings.iter().any(|w| matches!(
        w,
        ConvertWarning::UnresolvedReference { referenced_table, .. } if referenced_table == "other"
    )));
}

#[test]
fn test_missing_fk_column_repair() {
    let sql = "CREATE TABLE a (id int);\nCREATE TABLE b (id int, CONSTRAINT fk_a FOREIGN KEY (a_id) REFERENCES a (id));";

    let plain = convert_without_header(sql);
    assert!(!plain.sql.contains("a_id BIGINT"));

    let repaired = Converter::new(ConvertOptions {
        header: false,
        add_missing_fk_columns: true,
        ..Default::default()
    })
    .convert(sql);
    assert!(repaired.sql.contains("  a_id BIGINT\n"));
    assert!(repaired
        .warnings
        .iter()
        .any(|w| matches!(w, ConvertWarning::RepairedColumn { column, .. } if column == "a_id")));
}

#[test]
fn test_enum_and_fulltext_are_flagged() {
    let out = convert_without_header(
        "CREATE TABLE posts (\n  id int NOT NULL,\n  state enum('draft','live') NOT NULL,\n  body text,\n  FULLTEXT KEY ft_body (body)\n);",
    );
    assert!(out.sql.contains("-- Review: no PostgreSQL equivalent for CREATE FULLTEXT INDEX"));
    assert!(out.index_statements.is_empty());
    assert!(out
        .warnings
        .iter()
        .any(|w| matches!(w, ConvertWarning::UnsupportedFeature { feature, .. } if feature.contains("FULLTEXT"))));
}

#[test]
fn test_reconversion_changes_nothing() {
    let converter = Converter::new(ConvertOptions::default());
    let once = converter.convert(MYSQL_DUMP).sql;
    let twice = converter.convert(&once).sql;
    assert_eq!(once, twice);
}

#[test]
fn test_reconversion_with_schema_changes_nothing() {
    let converter = Converter::new(ConvertOptions {
        schema: Some("legacy".into()),
        ..Default::default()
    });
    let once = converter.convert(MYSQL_DUMP).sql;
    assert!(once.contains("CREATE SCHEMA IF NOT EXISTS legacy;"));
    assert!(once.contains("CREATE TABLE IF NOT EXISTS legacy.orders ("));
    assert!(once.contains("REFERENCES legacy.customers (id)"));
    assert_eq!(converter.convert(&once).sql, once);
}

#[test]
fn test_reconversion_keeps_columns_named_like_index_keywords() {
    let converter = Converter::new(ConvertOptions::default());
    let once = converter
        .convert("CREATE TABLE t (`key` varchar(10) NOT NULL, `fulltext` varchar(5), `spatial` int(11), `index` int(11));")
        .sql;
    assert!(once.contains("\"key\" varchar(10) NOT NULL"), "{once}");
    assert!(once.contains("\"fulltext\" varchar(5)"), "{once}");
    assert!(once.contains("\"spatial\" INTEGER"), "{once}");
    assert!(once.contains("\"index\" INTEGER"), "{once}");

    let twice = converter.convert(&once);
    assert_eq!(twice.sql, once);
    assert!(!twice.sql.contains("Review:"));
}

#[test]
fn test_source_comment_reading_like_a_section_marker_is_kept() {
    let out = convert_without_header("-- Indexes\nCREATE TABLE a (id int(11));\n");
    assert!(out.sql.starts_with("-- Indexes\nCREATE TABLE IF NOT EXISTS a ("), "{}", out.sql);
    assert_eq!(convert_without_header(&out.sql).sql, out.sql);
}

#[test]
fn test_string_defaults_survive_conversion() {
    let out = convert_without_header(
        "CREATE TABLE t (`note` varchar(40) DEFAULT 'signed or unsigned', `k` varchar(20) DEFAULT 'x ENGINE=InnoDB');",
    );
    assert!(out.sql.contains("note varchar(40) DEFAULT 'signed or unsigned'"), "{}", out.sql);
    assert!(out.sql.contains("k varchar(20) DEFAULT 'x ENGINE=InnoDB'"), "{}", out.sql);
    assert!(!out
        .warnings
        .iter()
        .any(|w| matches!(w, ConvertWarning::LossyConversion { from_type, .. } if from_type == "UNSIGNED")));
}

#[test]
fn test_empty_input() {
    let out = convert_without_header("");
    assert_eq!(out.sql, "\n");
    assert_eq!(out.stats.statements_read, 0);
}

#[test]
fn test_run_reads_compressed_input_and_writes_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("dump.sql.gz");
    let output = dir.path().join("out/schema.sql");

    let mut encoder = flate2::write::GzEncoder::new(
        fs::File::create(&input).unwrap(),
        flate2::Compression::default(),
    );
    encoder.write_all(MYSQL_DUMP.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let run = convert::run(ConvertConfig {
        input,
        output: Some(output.clone()),
        ..Default::default()
    })
    .unwrap();

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written, run.output.sql);
    assert_eq!(run.output_bytes, written.len() as u64);
    assert_eq!(run.encoding, TextEncoding::Utf8);
}

#[test]
fn test_run_falls_back_to_latin1() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("latin1.sql");
    fs::write(&input, b"-- caf\xe9\nCREATE TABLE t (id int);\n").unwrap();

    let run = convert::run(ConvertConfig {
        input,
        dry_run: true,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(run.encoding, TextEncoding::Latin1);
    assert!(run.output.sql.contains("-- café"));
    assert!(run
        .output
        .warnings
        .iter()
        .any(|w| matches!(w, ConvertWarning::EncodingFallback { .. })));
}

#[test]
fn test_run_reports_unreadable_input() {
    let err = convert::run(ConvertConfig {
        input: "/nonexistent/dump.sql".into(),
        dry_run: true,
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConvertError>(),
        Some(ConvertError::InputUnreadable { .. })
    ));
}

#[test]
fn test_run_reports_unwritable_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("dump.sql");
    fs::write(&input, "CREATE TABLE t (id int);\n").unwrap();
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, "").unwrap();

    let err = convert::run(ConvertConfig {
        input,
        output: Some(blocker.join("out.sql")),
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConvertError>(),
        Some(ConvertError::OutputUnwritable { .. })
    ));
}
