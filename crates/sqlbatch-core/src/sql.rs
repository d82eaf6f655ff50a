//! SQL text helpers for compound statements

/// Quote an identifier with backticks, doubling embedded backticks
pub(crate) fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `prefix` + `count` copies of `fragment` joined by `separator` + `postfix`
pub(crate) fn compound(
    prefix: &str,
    fragment: &str,
    separator: &str,
    count: usize,
    postfix: &str,
) -> String {
    let mut sql = String::with_capacity(
        prefix.len() + count * (fragment.len() + separator.len()) + postfix.len(),
    );
    sql.push_str(prefix);
    for i in 0..count {
        if i > 0 {
            sql.push_str(separator);
        }
        sql.push_str(fragment);
    }
    sql.push_str(postfix);
    sql
}
