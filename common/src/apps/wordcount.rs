use crate::{app::MapReduceApp, codec::KeyValue};

/// Normaliza un token: solo alfanumérico y '_', en minúscula.
pub(crate) fn clean_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

/// Tokens no vacíos de un texto, en orden de aparición.
pub(crate) fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(clean_token)
        .filter(|t| !t.is_empty())
}

/// WordCount: emite ("palabra", "1") por token y el reduce cuenta valores.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordCount;

impl MapReduceApp for WordCount {
    fn name(&self) -> &'static str {
        "wordcount"
    }

    fn map(&self, _source: &str, contents: &str) -> Vec<KeyValue> {
        tokens(contents).map(|t| KeyValue::new(t, "1")).collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        values.len().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Caso feliz: texto normal, mayúsculas, signos, etc.
    #[test]
    fn map_normaliza_tokens() {
        let kvs = WordCount.map("in.txt", "Hola hola, mundo!!\nmundo   mundo_prueba");
        let keys: Vec<&str> = kvs.iter().map(|kv| kv.key.as_str()).collect();

        assert_eq!(keys, vec!["hola", "hola", "mundo", "mundo", "mundo_prueba"]);
        assert!(kvs.iter().all(|kv| kv.value == "1"));
    }

    #[test]
    fn map_sobre_texto_vacio_no_emite_nada() {
        assert!(WordCount.map("vacio.txt", "").is_empty());
        assert!(WordCount.map("signos.txt", "!!! ,,, ...").is_empty());
    }

    #[test]
    fn reduce_cuenta_valores() {
        let values = vec!["1".to_string(); 3];
        assert_eq!(WordCount.reduce("hola", &values), "3");
    }
}
