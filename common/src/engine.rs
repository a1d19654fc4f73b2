use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::{
    app::MapReduceApp,
    codec::{self, CodecError, KeyValue},
    commit::write_atomic,
    partition::partition,
    task::{Phase, Task, TaskId},
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("error de E/S en {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("intermedio ilegible {}: {source}", path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("la tarea {phase} {task_id} no trae archivo de entrada")]
    MissingInput { phase: Phase, task_id: TaskId },

    #[error("se esperaba una tarea {expected} y llegó {got}")]
    WrongPhase { expected: Phase, got: Phase },
}

impl EngineError {
    fn io(path: &Path, source: io::Error) -> Self {
        EngineError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/* =========================
   Nombres de archivo
   ========================= */

/// Intermedio de la tarea map `map_id` para el bucket `bucket`: `mr-X-Y`.
pub fn intermediate_path(work_dir: &Path, map_id: TaskId, bucket: u32) -> PathBuf {
    work_dir.join(format!("mr-{}-{}", map_id, bucket))
}

/// Salida final de la tarea reduce: `mr-out-Y`.
pub fn output_path(work_dir: &Path, reduce_id: TaskId) -> PathBuf {
    work_dir.join(format!("mr-out-{}", reduce_id))
}

/* =========================
   Map: transformar -> particionar -> commit
   ========================= */

/// Ejecuta una tarea map y devuelve los intermedios ya visibles.
/// Se escribe un archivo por bucket aunque quede vacío, así el reduce
/// siempre encuentra los `total_map_tasks` archivos que espera.
pub fn run_map(app: &dyn MapReduceApp, task: &Task, work_dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
    if task.phase != Phase::Map {
        return Err(EngineError::WrongPhase {
            expected: Phase::Map,
            got: task.phase,
        });
    }
    let input = task.input_path.as_deref().ok_or(EngineError::MissingInput {
        phase: task.phase,
        task_id: task.id,
    })?;

    let contents = fs::read_to_string(input).map_err(|e| EngineError::io(Path::new(input), e))?;
    let kvs = app.map(input, &contents);
    let buckets = partition(kvs, task.total_reduce_buckets);

    let mut committed = Vec::with_capacity(buckets.len());
    for (bucket, records) in buckets.iter().enumerate() {
        let path = intermediate_path(work_dir, task.id, bucket as u32);
        write_atomic(&path, |w| codec::encode(records, w).map_err(into_io))
            .map_err(|e| EngineError::io(&path, e))?;
        committed.push(path);
    }

    Ok(committed)
}

/* =========================
   Reduce: merge -> ordenar -> agrupar -> commit
   ========================= */

#[derive(Debug, Clone)]
pub struct ReduceOutput {
    /// Archivo `mr-out-Y` ya visible
    pub output: PathBuf,
    /// Intermedios leídos; candidatos a limpieza cuando el master acepte la tarea
    pub consumed: Vec<PathBuf>,
}

/// Lee y concatena los intermedios `mr-*-Y` de todas las tareas map.
pub fn load_intermediates(task: &Task, work_dir: &Path) -> Result<(Vec<KeyValue>, Vec<PathBuf>), EngineError> {
    let mut merged = Vec::new();
    let mut consumed = Vec::with_capacity(task.total_map_tasks as usize);

    for map_id in 0..task.total_map_tasks {
        let path = intermediate_path(work_dir, map_id, task.id);
        let file = File::open(&path).map_err(|e| EngineError::io(&path, e))?;
        let mut records = codec::decode(file).map_err(|source| EngineError::Codec {
            path: path.clone(),
            source,
        })?;
        merged.append(&mut records);
        consumed.push(path);
    }

    Ok((merged, consumed))
}

/// Agrupa por clave. Ordena primero toda la colección (sort estable), así una
/// clave que llega de varios archivos queda en un único grupo y sus valores
/// conservan el orden de las tareas map.
pub fn group_by_key(mut records: Vec<KeyValue>) -> Vec<(String, Vec<String>)> {
    records.sort_by(|a, b| a.key.cmp(&b.key));

    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for kv in records {
        match groups.last_mut() {
            Some((key, values)) if *key == kv.key => values.push(kv.value),
            _ => groups.push((kv.key, vec![kv.value])),
        }
    }
    groups
}

/// Ejecuta una tarea reduce y escribe `mr-out-Y` con líneas "clave valor".
pub fn run_reduce(app: &dyn MapReduceApp, task: &Task, work_dir: &Path) -> Result<ReduceOutput, EngineError> {
    if task.phase != Phase::Reduce {
        return Err(EngineError::WrongPhase {
            expected: Phase::Reduce,
            got: task.phase,
        });
    }

    let (merged, consumed) = load_intermediates(task, work_dir)?;

    let mut out = String::new();
    for (key, values) in group_by_key(merged) {
        let reduced = app.reduce(&key, &values);
        out.push_str(&key);
        out.push(' ');
        out.push_str(&reduced);
        out.push('\n');
    }

    let output = output_path(work_dir, task.id);
    write_atomic(&output, |w| w.write_all(out.as_bytes())).map_err(|e| EngineError::io(&output, e))?;

    Ok(ReduceOutput { output, consumed })
}

/* =========================
   Despacho por fase
   ========================= */

/// Resultado ya commiteado de una tarea.
#[derive(Debug, Clone)]
pub enum TaskOutput {
    Map(Vec<PathBuf>),
    Reduce(ReduceOutput),
}

/// Ejecuta la tarea según su fase. Pensado para correr en `spawn_blocking`.
pub fn execute(app: &dyn MapReduceApp, task: &Task, work_dir: &Path) -> Result<TaskOutput, EngineError> {
    match task.phase {
        Phase::Map => run_map(app, task, work_dir).map(TaskOutput::Map),
        Phase::Reduce => run_reduce(app, task, work_dir).map(TaskOutput::Reduce),
    }
}

fn into_io(e: CodecError) -> io::Error {
    match e {
        CodecError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}
