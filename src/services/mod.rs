//! Business logic, one module per aggregate. Handlers stay thin and every
//! function here takes the `PgPool` handle it operates on.

pub mod projects;
pub mod tasks;
pub mod users;

/// Drops empty-string patch values so they behave as if absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Merge-patch for a required text field: only a present, non-empty value
/// overwrites.
pub(crate) fn merge_text(field: &mut String, value: Option<String>) {
    if let Some(v) = non_empty(value) {
        *field = v;
    }
}

/// Merge-patch for an optional text field. A present, non-empty value
/// overwrites; absent or empty leaves the stored value, so this API cannot
/// clear a field back to null.
pub(crate) fn merge_opt_text(field: &mut Option<String>, value: Option<String>) {
    if let Some(v) = non_empty(value) {
        *field = Some(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_filters_blank_values() {
        assert_eq!(non_empty(Some("value".to_string())), Some("value".to_string()));
        assert_eq!(non_empty(Some("".to_string())), None);
        assert_eq!(non_empty(Some("   ".to_string())), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_merge_text() {
        let mut field = "original".to_string();

        merge_text(&mut field, None);
        assert_eq!(field, "original");

        merge_text(&mut field, Some("".to_string()));
        assert_eq!(field, "original");

        merge_text(&mut field, Some("changed".to_string()));
        assert_eq!(field, "changed");
    }

    #[test]
    fn test_merge_opt_text() {
        let mut field = Some("original".to_string());

        merge_opt_text(&mut field, None);
        assert_eq!(field.as_deref(), Some("original"));

        merge_opt_text(&mut field, Some("".to_string()));
        assert_eq!(field.as_deref(), Some("original"));

        merge_opt_text(&mut field, Some("changed".to_string()));
        assert_eq!(field.as_deref(), Some("changed"));

        let mut unset: Option<String> = None;
        merge_opt_text(&mut unset, Some("first".to_string()));
        assert_eq!(unset.as_deref(), Some("first"));
    }
}
