use std::collections::{BTreeSet, HashSet};

use crate::{app::MapReduceApp, codec::KeyValue};

use super::wordcount::tokens;

/// Índice invertido: palabra -> documentos donde aparece.
/// Salida del reduce: "<n> <doc1>,<doc2>,..." con documentos ordenados.
#[derive(Debug, Default, Clone, Copy)]
pub struct Indexer;

impl MapReduceApp for Indexer {
    fn name(&self) -> &'static str {
        "indexer"
    }

    fn map(&self, source: &str, contents: &str) -> Vec<KeyValue> {
        let mut seen = HashSet::new();
        tokens(contents)
            .filter(|t| seen.insert(t.clone()))
            .map(|t| KeyValue::new(t, source))
            .collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        let docs: BTreeSet<&str> = values.iter().map(|v| v.as_str()).collect();
        let list: Vec<&str> = docs.into_iter().collect();
        format!("{} {}", list.len(), list.join(","))
    }
}
