// ── Category classification ──
//
// Maps a (category, code) pair to a normal/abnormal verdict and a label.
// The verdict predicate is fixed per category; labels come from code
// tables that ship with defaults and may be overridden by configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Category, PerCategory};

/// Code -> label lookup, one table per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTables(PerCategory<BTreeMap<i64, String>>);

impl Default for CodeTables {
    fn default() -> Self {
        fn table(entries: &[(i64, &str)]) -> BTreeMap<i64, String> {
            entries.iter().map(|&(c, l)| (c, l.to_owned())).collect()
        }

        Self(PerCategory {
            camera: table(&[
                (0, "normal"),
                (1, "clock stopped"),
                (2, "no signal"),
                (3, "panel damaged"),
                (4, "other anomaly"),
            ]),
            hdmi: table(&[
                (0, "normal"),
                (1, "clock stopped"),
                (2, "no signal"),
                (3, "other anomaly"),
            ]),
            ac: table(&[(0, "normal"), (1, "abnormal")]),
            dc: table(&[(0, "normal"), (1, "abnormal")]),
        })
    }
}

impl CodeTables {
    /// Add or replace labels for one category.
    pub fn with_labels(
        mut self,
        category: Category,
        labels: impl IntoIterator<Item = (i64, String)>,
    ) -> Self {
        self.0.get_mut(category).extend(labels);
        self
    }

    pub fn table(&self, category: Category) -> &BTreeMap<i64, String> {
        self.0.get(category)
    }

    pub fn label(&self, category: Category, code: i64) -> Option<&str> {
        self.table(category).get(&code).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &BTreeMap<i64, String>)> {
        self.0.iter()
    }
}

/// Outcome of classifying one code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_abnormal: bool,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryClassifier {
    tables: CodeTables,
}

impl CategoryClassifier {
    pub fn new(tables: CodeTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &CodeTables {
        &self.tables
    }

    /// Whether `code` is an abnormal reading for `category`.
    ///
    /// Camera and HDMI use 0 as the only healthy state with every other
    /// code naming a fault. AC and DC rails are binary; out-of-range codes
    /// count as faults too, so the predicate is the same for all four.
    pub fn is_abnormal(_category: Category, code: i64) -> bool {
        code != 0
    }

    /// Classify `code`. Unknown codes get a fallback label, never an error.
    pub fn classify(&self, category: Category, code: i64) -> Verdict {
        let label = self
            .tables
            .label(category, code)
            .map_or_else(|| format!("unknown state ({code})"), str::to_owned);
        Verdict {
            is_abnormal: Self::is_abnormal(category, code),
            label,
        }
    }
}
