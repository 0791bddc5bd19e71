/// Converts a 1-based column number into its letter label (`27` → `AA`).
pub fn column_label(column: usize) -> String {
    let mut remaining = column;
    let mut label = Vec::new();
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        label.push(b'A' + rem as u8);
        remaining = (remaining - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// Converts 1-based row and column numbers into A1 notation (`(10, 27)` → `AA10`).
pub fn rowcol_to_a1(row: usize, column: usize) -> String {
    format!("{}{row}", column_label(column))
}

/// Range covering `rows` × `columns` cells from the top-left corner.
pub fn full_range(rows: usize, columns: usize) -> String {
    format!("A1:{}", rowcol_to_a1(rows, columns))
}

/// Quotes a worksheet title for use in a range (`Q1 'plan'` → `'Q1 ''plan'''`).
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Prefixes a range with the quoted worksheet title.
pub fn sheet_range(title: &str, range: &str) -> String {
    format!("{}!{range}", quote_title(title))
}
