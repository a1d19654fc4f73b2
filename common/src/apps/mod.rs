use std::sync::Arc;

use crate::app::MapReduceApp;

pub mod indexer;
pub mod wordcount;

pub use indexer::Indexer;
pub use wordcount::WordCount;

/// Aplicación por nombre (`MR_APP` en el worker).
pub fn by_name(name: &str) -> Option<Arc<dyn MapReduceApp>> {
    match name {
        "wordcount" | "wc" => Some(Arc::new(WordCount)),
        "indexer" => Some(Arc::new(Indexer)),
        _ => None,
    }
}
