// src/common/csv.rs
//
// Leitor/escritor CSV (RFC 4180) usado no import/export de materiais
// e nos relatórios em CSV.

use std::collections::BTreeMap;

use crate::common::error::AppError;

// ---
// Escrita
// ---

#[derive(Debug, Default)]
pub struct CsvWriter {
    buf: String,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut first = true;
        for field in fields {
            if !first {
                self.buf.push(',');
            }
            first = false;
            push_field(&mut self.buf, field.as_ref());
        }
        self.buf.push_str("\r\n");
        self
    }

    // Linha em branco separando seções (relatórios)
    pub fn blank(&mut self) -> &mut Self {
        self.buf.push_str("\r\n");
        self
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

fn push_field(buf: &mut String, field: &str) {
    let needs_quotes = field.contains([',', '"', '\r', '\n']);
    if !needs_quotes {
        buf.push_str(field);
        return;
    }
    buf.push('"');
    for c in field.chars() {
        if c == '"' {
            buf.push('"');
        }
        buf.push(c);
    }
    buf.push('"');
}

// ---
// Leitura
// ---

/// Quebra o texto em linhas de campos. Aspas duplas escapam vírgulas e quebras de linha.
pub fn parse(text: &str) -> Result<Vec<Vec<String>>, AppError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(AppError::BadRequest("CSV has an unterminated quoted field".into()));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    // Linhas totalmente vazias não contam
    rows.retain(|r| !(r.len() == 1 && r[0].trim().is_empty()));
    Ok(rows)
}

/// CSV com cabeçalho: devolve os nomes das colunas e cada linha como `coluna -> valor`.
/// Células vazias ficam de fora do mapa.
pub fn parse_with_headers(
    text: &str,
) -> Result<(Vec<String>, Vec<BTreeMap<String, String>>), AppError> {
    let mut rows = parse(text)?.into_iter();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| AppError::BadRequest("CSV file is empty".into()))?
        .into_iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let records = rows
        .map(|row| {
            headers
                .iter()
                .zip(row)
                .filter_map(|(h, v)| {
                    let v = v.trim().to_string();
                    (!v.is_empty()).then(|| (h.clone(), v))
                })
                .collect()
        })
        .collect();

    Ok((headers, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_quotes_only_when_needed() {
        let mut w = CsvWriter::new();
        w.row(["category", "description"]);
        w.row(["FRAMING", "2x4, kiln dried"]);
        w.row(["OTHER", "6\" pipe"]);
        assert_eq!(
            w.finish(),
            "category,description\r\nFRAMING,\"2x4, kiln dried\"\r\nOTHER,\"6\"\" pipe\"\r\n"
        );
    }

    #[test]
    fn parser_reads_back_quoted_fields() {
        let rows = parse("a,b\r\n\"x, y\",\"say \"\"hi\"\"\"\r\n\"multi\nline\",z").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["x, y", "say \"hi\""]);
        assert_eq!(rows[2], vec!["multi\nline", "z"]);
    }

    #[test]
    fn parser_skips_blank_lines_and_bom() {
        let rows = parse("\u{feff}a,b\n\n1,2\n").unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        assert!(parse("a,\"b\n").is_err());
    }

    #[test]
    fn headers_map_cells_and_drop_empty_ones() {
        let (headers, records) =
            parse_with_headers("Category,Description,Notes\nFRAMING,Studs,\n").unwrap();
        assert_eq!(headers, vec!["category", "description", "notes"]);
        assert_eq!(records[0].get("category").map(String::as_str), Some("FRAMING"));
        assert!(!records[0].contains_key("notes"));
    }
}
