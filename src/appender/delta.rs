//! Translation of unflushed chunk bytes into update expression clauses

use crate::chunkenc::to_words;

use super::{
    ChunkBuffer, Metric, LSET_ATTR, MAX_TIME_ATTR, META_ATTR, METRIC_NAME_LABEL, NAME_ATTR,
    VALUE_COLUMN_PREFIX,
};

/// Clauses writing the unflushed words of `buffer` into its chunk column.
///
/// Words below the flush marker are never touched. A chunk flushed from its
/// first byte allocates the column first.
pub fn chunk_delta_clauses(buffer: &ChunkBuffer, max_array_size: usize) -> Vec<String> {
    let (Some(partition), Some(range)) = (buffer.partition(), buffer.unflushed_range()) else {
        return Vec::new();
    };

    let index = partition.chunk_index(buffer.chunk_start());
    let column = partition.column_for_chunk(VALUE_COLUMN_PREFIX, index);
    let words = to_words(range.bytes);
    let mut clauses = Vec::with_capacity(words.len() + 3);

    if range.offset == 0 {
        clauses.push(format!("{}=init_array({},'int')", column, max_array_size));
    }

    clauses.push(format!("{}[{}]={}", META_ATTR, index, range.meta as i64));

    let first = range.offset / 8;
    for (i, word) in words.into_iter().enumerate() {
        clauses.push(format!("{}[{}]={}", column, first + i, word as i64));
    }

    clauses.push(format!("{}={}", MAX_TIME_ATTR, buffer.last_timestamp()));
    clauses
}

/// Clauses run once per partition item: label columns and the meta array
pub fn metric_init_clauses(metric: &Metric, meta_size: usize) -> Vec<String> {
    let mut clauses: Vec<String> = metric
        .labels()
        .iter()
        .map(|label| {
            let column = if label.name == METRIC_NAME_LABEL {
                NAME_ATTR
            } else {
                label.name.as_str()
            };
            format!("{}={}", column, quote(&label.value))
        })
        .collect();

    clauses.push(format!("{}={}", LSET_ATTR, quote(metric.key())));
    clauses.push(format!("{}=init_array({},'int')", META_ATTR, meta_size));
    clauses
}

/// String literal with embedded quotes doubled
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
