/// Renders an index into its external identifier.
///
/// `index_pad` is a digit string whose length is the minimum width of the
/// numeral (`"0"` is width 1, `"00000"` is width 5). The numeral is
/// left-padded with `'0'` and never truncated, then appended to `prefix` with
/// no separator. A negative index keeps its sign ahead of the padding.
///
/// # Example
///
/// ```
/// use ordinal::format_identifier;
///
/// assert_eq!(format_identifier("INV-", 42, "00000"), "INV-00042");
/// assert_eq!(format_identifier("INV-", 123456, "000"), "INV-123456");
/// ```
pub fn format_identifier(prefix: &str, index: i64, index_pad: &str) -> String {
    let width = index_pad.len();
    format!("{prefix}{index:0width$}")
}
