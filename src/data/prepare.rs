use crate::data::loader::RawTable;
use crate::error::{AppError, Result};
use crate::models::{Department, TrainingRecord, Urgency};
use tracing::{debug, info};

const TEXT_HINTS: [&str; 4] = ["text", "description", "message", "content"];

/// How ticket text is assembled from the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextSource {
    TitleBody { title: usize, body: usize },
    Column(usize),
}

impl TextSource {
    fn resolve(table: &RawTable) -> Result<Self> {
        if let (Some(title), Some(body)) = (table.column("title"), table.column("body")) {
            return Ok(TextSource::TitleBody { title, body });
        }
        for name in ["description", "text"] {
            if let Some(col) = table.column(name) {
                return Ok(TextSource::Column(col));
            }
        }

        table
            .headers
            .iter()
            .position(|h| {
                let lower = h.to_lowercase();
                TEXT_HINTS.iter().any(|hint| lower.contains(hint))
            })
            .map(TextSource::Column)
            .ok_or_else(|| {
                AppError::DataShape(format!(
                    "no text column found among {:?}",
                    table.headers
                ))
            })
    }

    fn text(&self, table: &RawTable, row: usize) -> Option<String> {
        match *self {
            TextSource::TitleBody { title, body } => {
                let title = table.cell(row, title).unwrap_or("");
                let body = table.cell(row, body).unwrap_or("");
                Some(format!("{title} {body}"))
            }
            TextSource::Column(col) => table.cell(row, col).map(str::to_string),
        }
    }
}

fn first_column(table: &RawTable, names: &[&str], role: &str) -> Result<usize> {
    names
        .iter()
        .find_map(|name| table.column(name))
        .ok_or_else(|| {
            AppError::DataShape(format!(
                "no {role} column found (expected one of {names:?})"
            ))
        })
}

/// Clean a raw table into labelled training rows.
///
/// Rows with a missing field or blank text are dropped; labels are trimmed
/// and lower-cased. With `canonicalize`, labels are folded onto the fixed
/// department and urgency vocabularies.
pub fn prepare_data(table: &RawTable, canonicalize: bool) -> Result<Vec<TrainingRecord>> {
    let text_source = TextSource::resolve(table)?;
    let category_col = first_column(table, &["category", "type"], "category")?;
    let urgency_col = first_column(table, &["urgency", "priority"], "urgency")?;

    let mut records = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let (Some(text), Some(category), Some(urgency)) = (
            text_source.text(table, row),
            table.cell(row, category_col),
            table.cell(row, urgency_col),
        ) else {
            continue;
        };

        let text = text.trim();
        let category = category.trim().to_lowercase();
        let urgency = urgency.trim().to_lowercase();
        if text.is_empty() || category.is_empty() || urgency.is_empty() {
            continue;
        }

        let (category, urgency) = if canonicalize {
            (
                Department::from_label(&category).to_string(),
                Urgency::from_label(&urgency).to_string(),
            )
        } else {
            (category, urgency)
        };

        records.push(TrainingRecord {
            text: text.to_string(),
            category,
            urgency,
        });
    }

    let dropped = table.len() - records.len();
    if dropped > 0 {
        debug!(dropped = dropped, "Dropped incomplete training rows");
    }
    if records.is_empty() {
        return Err(AppError::DataShape(
            "no usable training rows after cleaning".to_string(),
        ));
    }

    info!(
        rows = records.len(),
        dropped = dropped,
        canonicalized = canonicalize,
        "Prepared training data"
    );
    Ok(records)
}
