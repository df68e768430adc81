//! Column type remapping from MySQL to PostgreSQL.
//!
//! One ordered table of rules drives both the structured path (a parsed
//! [`ColumnDefinition`]) and text mode (types embedded in statements that
//! are not parsed, such as `ALTER TABLE ... MODIFY`). The first matching
//! rule wins, so the auto-increment rules see the declared width before the
//! width-stripping rules run.

use crate::schema::scan::map_unquoted;
use crate::schema::{ColumnDefinition, ColumnModifier, DataType};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// When a rule may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    /// Only for columns declared `AUTO_INCREMENT`.
    AutoIncrement,
}

/// One remapping rule. `source` is matched against the whole canonical type
/// text (`int(11)`, `datetime`, ...), case-insensitively.
#[derive(Debug, Clone, Copy)]
pub struct TypeRule {
    pub label: &'static str,
    pub source: &'static str,
    pub target: &'static str,
    pub when: Condition,
}

pub const TYPE_RULES: &[TypeRule] = &[
    TypeRule {
        label: "64-bit auto-increment",
        source: r"bigint(\(\d+\))?",
        target: "BIGSERIAL",
        when: Condition::AutoIncrement,
    },
    TypeRule {
        label: "32-bit auto-increment",
        source: r"(tinyint|smallint|mediumint|int|integer)(\(\d+\))?",
        target: "SERIAL",
        when: Condition::AutoIncrement,
    },
    TypeRule {
        label: "boolean flag",
        source: r"tinyint\(1\)",
        target: "BOOLEAN",
        when: Condition::Always,
    },
    TypeRule {
        label: "single bit",
        source: r"bit(\(1\))?",
        target: "BOOLEAN",
        when: Condition::Always,
    },
    TypeRule {
        label: "tiny integer",
        source: r"tinyint(\(\d+\))?",
        target: "SMALLINT",
        when: Condition::Always,
    },
    TypeRule {
        label: "small integer width",
        source: r"smallint\(\d+\)",
        target: "SMALLINT",
        when: Condition::Always,
    },
    TypeRule {
        label: "medium integer",
        source: r"mediumint(\(\d+\))?",
        target: "INTEGER",
        when: Condition::Always,
    },
    TypeRule {
        label: "integer width",
        source: r"(int|integer)\(\d+\)",
        target: "INTEGER",
        when: Condition::Always,
    },
    TypeRule {
        label: "big integer width",
        source: r"bigint\(\d+\)",
        target: "BIGINT",
        when: Condition::Always,
    },
    TypeRule {
        label: "datetime",
        source: r"datetime(\(\d+\))?",
        target: "TIMESTAMP",
        when: Condition::Always,
    },
    TypeRule {
        label: "sized text",
        source: r"(long|medium|tiny)text",
        target: "TEXT",
        when: Condition::Always,
    },
    TypeRule {
        label: "year",
        source: r"year(\(\d+\))?",
        target: "SMALLINT",
        when: Condition::Always,
    },
];

static COMPILED: Lazy<Vec<(&'static TypeRule, Regex)>> = Lazy::new(|| {
    TYPE_RULES
        .iter()
        .map(|rule| {
            let re = Regex::new(&format!(r"(?i)^(?:{})$", rule.source)).unwrap();
            (rule, re)
        })
        .collect()
});

/// Candidate type tokens for text mode.
static RE_TYPE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(tinyint|smallint|mediumint|integer|int|bigint|bit|datetime|longtext|mediumtext|tinytext|year)\b(\s*\(\s*\d+\s*\))?",
    )
    .unwrap()
});

static RE_QUOTED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^'(-?\d+(\.\d+)?)'$").unwrap());

/// First rule matching `canonical`, honoring the auto-increment precondition.
pub fn find_rule(canonical: &str, auto_increment: bool) -> Option<&'static TypeRule> {
    COMPILED
        .iter()
        .filter(|(rule, _)| rule.when == Condition::Always || auto_increment)
        .find(|(_, re)| re.is_match(canonical))
        .map(|(rule, _)| *rule)
}

/// What happened to a column during remapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Remap {
    /// Label of the rule that fired.
    pub rule: Option<&'static str>,
    /// `UNSIGNED`/`ZEROFILL` was dropped.
    pub dropped_unsigned: bool,
    /// `AUTO_INCREMENT` on a type no rule converts; the keyword was dropped.
    pub dropped_auto_increment: bool,
}

/// Remap a parsed column's type and adjust its modifiers to match.
pub fn remap_column(column: &mut ColumnDefinition) -> Remap {
    let mut remap = Remap::default();
    let auto_increment = column.is_auto_increment();

    if let Some(rule) = find_rule(&column.data_type.canonical(), auto_increment) {
        column.data_type = DataType::named(rule.target);
        remap.rule = Some(rule.label);

        if rule.when == Condition::AutoIncrement {
            // SERIAL implies NOT NULL and its own default.
            column
                .modifiers
                .retain(|m| !matches!(m, ColumnModifier::AutoIncrement | ColumnModifier::NotNull));
        }
    }

    if column.is_auto_increment() {
        column
            .modifiers
            .retain(|m| *m != ColumnModifier::AutoIncrement);
        remap.dropped_auto_increment = true;
    }

    if column.unsigned {
        column.unsigned = false;
        remap.dropped_unsigned = true;
    }

    normalize_default(column);
    remap
}

/// Fit the default literal to the (already remapped) column type.
fn normalize_default(column: &mut ColumnDefinition) {
    let Some(value) = column.default_value() else {
        return;
    };

    let replacement = if column.data_type.is_boolean() {
        match value.to_ascii_lowercase().as_str() {
            "0" | "'0'" | "b'0'" => Some("FALSE".to_string()),
            "1" | "'1'" | "b'1'" => Some("TRUE".to_string()),
            _ => None,
        }
    } else if column.data_type.is_numeric() {
        RE_QUOTED_NUMBER
            .captures(value)
            .map(|caps| caps[1].to_string())
    } else {
        None
    };

    if let Some(replacement) = replacement {
        column.set_default(replacement);
    }
}

/// Remap type tokens inside unparsed statement text.
///
/// Only rules without a precondition apply. A word is not treated as a type
/// when the next word is itself a type keyword (it is then a column name, as
/// in `year int`).
pub fn remap_types_in_text(text: &str) -> String {
    map_unquoted(text, |plain| {
        RE_TYPE_TOKEN
            .replace_all(plain, |caps: &Captures| {
                let whole = &caps[0];
                let end = caps.get(0).map_or(0, |m| m.end());
                if next_word_is_type(&plain[end..]) {
                    return whole.to_string();
                }
                let canonical: String = whole.chars().filter(|c| !c.is_whitespace()).collect();
                match find_rule(&canonical, false) {
                    Some(rule) => rule.target.to_string(),
                    None => whole.to_string(),
                }
            })
            .into_owned()
    })
}

fn next_word_is_type(rest: &str) -> bool {
    let word: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    !word.is_empty() && crate::schema::is_type_keyword(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(ty: &str, params: Option<&str>, modifiers: Vec<ColumnModifier>) -> ColumnDefinition {
        let mut c = ColumnDefinition::new(
            "c",
            DataType {
                name: ty.to_string(),
                params: params.map(String::from),
                suffix: None,
            },
        );
        c.modifiers = modifiers;
        c
    }

    #[test]
    fn test_rule_table_totality() {
        let cases = [
            ("tinyint(1)", "BOOLEAN"),
            ("TINYINT(4)", "SMALLINT"),
            ("tinyint", "SMALLINT"),
            ("smallint(6)", "SMALLINT"),
            ("mediumint(9)", "INTEGER"),
            ("int(11)", "INTEGER"),
            ("integer(10)", "INTEGER"),
            ("bigint(20)", "BIGINT"),
            ("bit(1)", "BOOLEAN"),
            ("bit", "BOOLEAN"),
            ("datetime", "TIMESTAMP"),
            ("datetime(6)", "TIMESTAMP"),
            ("longtext", "TEXT"),
            ("mediumtext", "TEXT"),
            ("tinytext", "TEXT"),
            ("year", "SMALLINT"),
            ("year(4)", "SMALLINT"),
        ];
        for (source, target) in cases {
            let rule = find_rule(source, false).unwrap_or_else(|| panic!("no rule for {source}"));
            assert_eq!(rule.target, target, "{source}");
        }
    }

    #[test]
    fn test_unmatched_types_pass_through() {
        for ty in ["varchar(255)", "int", "bigint", "decimal(10,2)", "text", "bit(8)", "BOOLEAN"] {
            assert!(find_rule(ty, false).is_none(), "{ty}");
        }
    }

    #[test]
    fn test_auto_increment_sees_width_first() {
        assert_eq!(find_rule("bigint(20)", true).unwrap().target, "BIGSERIAL");
        assert_eq!(find_rule("int(11)", true).unwrap().target, "SERIAL");
        assert_eq!(find_rule("tinyint(1)", true).unwrap().target, "SERIAL");
        assert_eq!(find_rule("bigint", true).unwrap().target, "BIGSERIAL");
    }

    #[test]
    fn test_serial_drops_not_null_and_auto_increment() {
        let mut c = column(
            "bigint",
            Some("20"),
            vec![ColumnModifier::NotNull, ColumnModifier::AutoIncrement],
        );
        let remap = remap_column(&mut c);
        assert_eq!(remap.rule, Some("64-bit auto-increment"));
        assert_eq!(c.data_type.to_string(), "BIGSERIAL");
        assert!(c.modifiers.is_empty());
    }

    #[test]
    fn test_auto_increment_on_unmapped_type_is_dropped() {
        let mut c = column("decimal", Some("10,0"), vec![ColumnModifier::AutoIncrement]);
        let remap = remap_column(&mut c);
        assert!(remap.dropped_auto_increment);
        assert!(c.modifiers.is_empty());
        assert_eq!(c.data_type.to_string(), "decimal(10,0)");
    }

    #[test]
    fn test_boolean_defaults() {
        let mut c = column("tinyint", Some("1"), vec![ColumnModifier::Default("'1'".into())]);
        remap_column(&mut c);
        assert_eq!(c.default_value(), Some("TRUE"));

        let mut c = column("bit", Some("1"), vec![ColumnModifier::Default("FALSE".into())]);
        remap_column(&mut c);
        assert_eq!(c.default_value(), Some("FALSE"));
    }

    #[test]
    fn test_numeric_default_unquoted() {
        let mut c = column("int", Some("11"), vec![ColumnModifier::Default("'42'".into())]);
        remap_column(&mut c);
        assert_eq!(c.default_value(), Some("42"));

        let mut c = column("varchar", Some("10"), vec![ColumnModifier::Default("'42'".into())]);
        remap_column(&mut c);
        assert_eq!(c.default_value(), Some("'42'"));
    }

    #[test]
    fn test_unsigned_dropped() {
        let mut c = column("int", Some("10"), vec![]);
        c.unsigned = true;
        let remap = remap_column(&mut c);
        assert!(remap.dropped_unsigned);
        assert!(!c.unsigned);
    }

    #[test]
    fn test_text_mode() {
        assert_eq!(
            remap_types_in_text("ALTER TABLE t MODIFY c int(11) NOT NULL, ADD d datetime"),
            "ALTER TABLE t MODIFY c INTEGER NOT NULL, ADD d TIMESTAMP"
        );
        assert_eq!(
            remap_types_in_text("ALTER TABLE t ADD year int(4), ADD \"int(3)\" tinyint(1)"),
            "ALTER TABLE t ADD year INTEGER, ADD \"int(3)\" BOOLEAN"
        );
        assert_eq!(remap_types_in_text("SELECT 'bigint(20)'"), "SELECT 'bigint(20)'");
    }
}
