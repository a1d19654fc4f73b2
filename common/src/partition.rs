use fnv::FnvHasher;
use std::hash::Hasher;

use crate::codec::KeyValue;

/// Bucket de reduce para una clave: FNV-1a de 64 bits sobre los bytes de la
/// clave, módulo `buckets`. No depende del proceso ni de la versión de Rust,
/// así que todos los workers particionan igual.
pub fn bucket_for(key: &str, buckets: u32) -> u32 {
    let mut h = FnvHasher::default();
    h.write(key.as_bytes());
    (h.finish() % buckets.max(1) as u64) as u32
}

/// Reparte los registros en exactamente `buckets` grupos (algunos pueden
/// quedar vacíos), conservando el orden relativo dentro de cada grupo.
pub fn partition(records: Vec<KeyValue>, buckets: u32) -> Vec<Vec<KeyValue>> {
    let n = buckets.max(1);
    let mut out: Vec<Vec<KeyValue>> = (0..n).map(|_| Vec::new()).collect();

    for kv in records {
        let b = bucket_for(&kv.key, n) as usize;
        out[b].push(kv);
    }

    out
}
