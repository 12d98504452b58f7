//! Pure transforms between records and API shapes.
//!
//! `to_response(None)` is `None`; list variants drop `None`s. Request mappers
//! take server-known ids (caller, creator) as arguments and never read them from the body.

pub mod order;
pub mod product;
pub mod shipment;
pub mod user;

/// Apply a single-record mapper over a slice, dropping `None` results.
pub fn map_all<'a, T, R>(records: &'a [T], map: impl Fn(Option<&'a T>) -> Option<R>) -> Vec<R> {
    records.iter().filter_map(|r| map(Some(r))).collect()
}

/// Trim; blank becomes `None`.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_all_drops_nones() {
        let values = [1, 2, 3, 4];
        let evens = map_all(&values, |v| v.filter(|n| *n % 2 == 0).map(|n| n * 10));
        assert_eq!(evens, vec![20, 40]);
    }

    #[test]
    fn clean_blanks() {
        assert_eq!(clean(Some("  ".into())), None);
        assert_eq!(clean(Some(" Hue ".into())), Some("Hue".into()));
        assert_eq!(clean(None), None);
    }
}
