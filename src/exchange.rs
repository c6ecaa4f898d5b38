use crate::live::Keyed;
use crate::model::Student;
use serde::Serialize;

pub const STUDENT_HEADERS: [&str; 5] = [
    "Full Name",
    "Roll Number",
    "Class",
    "Parent Name",
    "Parent Contact",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowIssue {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportError {
    #[error("file is empty")]
    Empty,
    #[error("missing column: {0}")]
    MissingColumn(&'static str),
    #[error("{} row(s) failed validation", .0.len())]
    Rows(Vec<RowIssue>),
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn parse_csv_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            _ => field.push(ch),
        }
    }
    fields.push(field);
    fields
}

/// Splits text into records, keeping newlines that sit inside quotes.
/// Each record carries the 1-based line it starts on.
pub fn split_records(text: &str) -> Vec<(usize, String)> {
    let mut records = Vec::new();
    let mut record = String::new();
    let mut quoted = false;
    let mut line = 1;
    let mut start = 1;
    for ch in text.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                record.push(ch);
            }
            '\n' if !quoted => {
                if record.ends_with('\r') {
                    record.pop();
                }
                records.push((start, std::mem::take(&mut record)));
                line += 1;
                start = line;
            }
            '\n' => {
                record.push(ch);
                line += 1;
            }
            _ => record.push(ch),
        }
    }
    if !record.is_empty() {
        records.push((start, record));
    }
    records
}

fn column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

/// Parses every row up front; any bad row rejects the whole file.
pub fn parse_student_rows(text: &str) -> Result<Vec<Student>, ImportError> {
    let mut lines = split_records(text.trim_start_matches('\u{feff}'))
        .into_iter()
        .filter(|(_, l)| !l.trim().is_empty());
    let Some((_, header_line)) = lines.next() else {
        return Err(ImportError::Empty);
    };
    let headers = parse_csv_record(&header_line);
    let name_col =
        column(&headers, &["Full Name", "Name"]).ok_or(ImportError::MissingColumn("Full Name"))?;
    let roll_col = column(&headers, &["Roll Number"]);
    let class_col = column(&headers, &["Class"]);
    let parent_col = column(&headers, &["Parent Name"]);
    let contact_col = column(&headers, &["Parent Contact"]);

    let mut students = Vec::new();
    let mut issues = Vec::new();
    for (line_no, line) in lines {
        let fields = parse_csv_record(&line);
        let get = |col: Option<usize>| {
            col.and_then(|c| fields.get(c))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let full_name = get(Some(name_col));
        if full_name.is_empty() {
            issues.push(RowIssue {
                line: line_no,
                message: "Full Name is required".to_string(),
            });
            continue;
        }
        students.push(Student {
            full_name,
            roll_number: get(roll_col),
            class_id: get(class_col),
            parent_name: get(parent_col),
            parent_contact: get(contact_col),
        });
    }
    if !issues.is_empty() {
        return Err(ImportError::Rows(issues));
    }
    Ok(students)
}

pub fn students_to_csv(students: &[Keyed<Student>]) -> String {
    let mut out = String::from("id,");
    out.push_str(&STUDENT_HEADERS.join(","));
    out.push('\n');
    for s in students {
        let cells: [&str; 6] = [
            s.id.as_str(),
            &s.record.full_name,
            &s.record.roll_number,
            &s.record.class_id,
            &s.record.parent_name,
            &s.record.parent_contact,
        ];
        let line: Vec<String> = cells.iter().map(|c| csv_quote(c)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

pub fn student_template_csv() -> String {
    let mut out = STUDENT_HEADERS.join(",");
    out.push('\n');
    out.push_str("John Doe,101,class_id_here,Jane Doe,555-0101\n");
    out.push_str("Alice Smith,102,class_id_here,Bob Smith,555-0102\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        assert_eq!(
            parse_csv_record(r#"a,"b, c","say ""hi""""#),
            vec!["a", "b, c", r#"say "hi""#]
        );
        assert_eq!(csv_quote("x,y"), "\"x,y\"");
        assert_eq!(csv_quote("plain"), "plain");
    }

    #[test]
    fn multi_line_cells_survive_export_and_import() {
        let exported = students_to_csv(&[Keyed {
            id: "s1".to_string(),
            record: Student {
                full_name: "Ada Lovelace".into(),
                roll_number: "7".into(),
                class_id: "c1".into(),
                parent_name: "Mary\nJones".into(),
                parent_contact: "555, ext 2".into(),
            },
        }]);
        let rows = parse_student_rows(&exported).expect("reimport");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].parent_name, "Mary\nJones");
        assert_eq!(rows[0].parent_contact, "555, ext 2");
        assert_eq!(rows[0].class_id, "c1");

        let err = parse_student_rows("Full Name,Parent Name\r\nAda,\"two\r\nlines\"\r\n,x\r\n")
            .unwrap_err();
        match err {
            ImportError::Rows(issues) => assert_eq!(issues[0].line, 4),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn template_parses_back_into_students() {
        let rows = parse_student_rows(&student_template_csv()).expect("template");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].full_name, "John Doe");
        assert_eq!(rows[1].parent_contact, "555-0102");
    }

    #[test]
    fn name_alias_and_missing_optional_columns() {
        let rows = parse_student_rows("Name,Class\nAda,c1\n").expect("rows");
        assert_eq!(rows[0].full_name, "Ada");
        assert_eq!(rows[0].class_id, "c1");
        assert_eq!(rows[0].roll_number, "");
    }

    #[test]
    fn any_bad_row_rejects_the_file() {
        let err = parse_student_rows("Full Name,Class\nAda,c1\n,c1\nBob,c2\n").unwrap_err();
        match err {
            ImportError::Rows(issues) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].line, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            parse_student_rows("Class\nc1\n").unwrap_err(),
            ImportError::MissingColumn("Full Name")
        );
        assert_eq!(parse_student_rows("  \n").unwrap_err(), ImportError::Empty);
    }
}
