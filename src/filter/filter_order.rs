use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};
use crate::database::entity::Table;

pub struct FilterOrder;

impl FilterOrder {
    /// Pair order fields with directions. Unknown fields are skipped.
    pub fn from_pairs<F, D>(table: Table, fields: &[F], types: &[D]) -> Result<Vec<FilterOrderInfo>, FilterError>
    where
        F: AsRef<str>,
        D: AsRef<str>,
    {
        if fields.len() != types.len() {
            return Err(FilterError::OrderLengthMismatch {
                fields: fields.len(),
                types: types.len(),
            });
        }

        let mut out = Vec::with_capacity(fields.len());
        for (field, sort) in fields.iter().zip(types) {
            let field = field.as_ref().trim();
            if table.filterable_column(field).is_none() {
                tracing::warn!("Skipping order by unknown column '{}' on {}", field, table.name);
                continue;
            }
            out.push(FilterOrderInfo {
                column: field.to_string(),
                sort: SortDirection::parse(sort.as_ref()),
            });
        }
        Ok(out)
    }

    /// Parse `"created_at desc, title"` style order strings
    pub fn parse_order_string(table: Table, s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut fields = vec![];
        let mut types = vec![];
        for part in s.split(',') {
            let mut it = part.split_whitespace();
            if let Some(col) = it.next() {
                fields.push(col);
                types.push(it.next().unwrap_or("asc"));
            }
        }
        Self::from_pairs(table, &fields[..], &types[..])
    }

    /// End the order on a unique column so LIMIT/OFFSET slices are stable across pages
    pub fn with_tiebreaker(mut infos: Vec<FilterOrderInfo>) -> Vec<FilterOrderInfo> {
        let unique = infos.iter().any(|i| i.column == "id" || i.column == "uu_id");
        if !unique {
            infos.push(FilterOrderInfo {
                column: "id".to_string(),
                sort: SortDirection::Asc,
            });
        }
        infos
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entity::{Column, SqlType};

    const COLUMNS: &[Column] = &[
        Column::new("title", SqlType::Text),
        Column::secret("digest", SqlType::Text),
    ];

    fn table() -> Table {
        Table { name: "notes", columns: COLUMNS }
    }

    #[test]
    fn pairs_fields_with_directions() {
        let infos = FilterOrder::from_pairs(table(), &["title", "created_at"], &["desc", "ASC"]).unwrap();
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY \"title\" DESC, \"created_at\" ASC");
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = FilterOrder::from_pairs(table(), &["title", "id"], &["asc"]).unwrap_err();
        assert!(matches!(err, FilterError::OrderLengthMismatch { fields: 2, types: 1 }));
    }

    #[test]
    fn unknown_fields_are_dropped() {
        let infos = FilterOrder::from_pairs(table(), &["nope", "id"], &["asc", "d"]).unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].sort, SortDirection::Desc);
    }

    #[test]
    fn secret_columns_are_not_sortable() {
        let infos = FilterOrder::from_pairs(table(), &["digest", "title"], &["asc", "asc"]).unwrap();
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY \"title\" ASC");
    }

    #[test]
    fn tiebreaker_is_appended_unless_order_is_unique() {
        let infos = FilterOrder::from_pairs(table(), &["title"], &["desc"]).unwrap();
        let infos = FilterOrder::with_tiebreaker(infos);
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY \"title\" DESC, \"id\" ASC");

        let infos = FilterOrder::from_pairs(table(), &["nope"], &["asc"]).unwrap();
        assert_eq!(FilterOrder::generate(&FilterOrder::with_tiebreaker(infos)), "ORDER BY \"id\" ASC");

        let infos = FilterOrder::from_pairs(table(), &["uu_id"], &["desc"]).unwrap();
        assert_eq!(FilterOrder::with_tiebreaker(infos).len(), 1);
    }

    #[test]
    fn order_string() {
        let infos = FilterOrder::parse_order_string(table(), "updated_at desc, title").unwrap();
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY \"updated_at\" DESC, \"title\" ASC");
        assert_eq!(FilterOrder::generate(&[]), "");
    }
}
