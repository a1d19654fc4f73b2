use crate::codec::KeyValue;

/// Funciones de usuario que ejecuta el worker. El motor sólo ve este trait.
pub trait MapReduceApp: Send + Sync {
    fn name(&self) -> &'static str;

    /// `(nombre de la fuente, contenido) -> registros`
    fn map(&self, source: &str, contents: &str) -> Vec<KeyValue>;

    /// `(clave, valores) -> valor de salida` (se escribe como "clave valor")
    fn reduce(&self, key: &str, values: &[String]) -> String;
}
