//! Playlist exporters reading the staged track data through a
//! caller-supplied view.
//!
//! The view is an opaque external collaborator: it supplies the set of
//! track identifiers to export (`itunes_id`) and an explicit `row_number`
//! ordering column. Both exporters join it against the staging table on the
//! persistent identifier.

pub mod m3u;
pub mod scrub;
pub mod xml;

/// Builds the join query both exporters share.
///
/// The view name is caller configuration and is interpolated as an
/// identifier; record values never reach statement text.
fn view_join_sql(columns: &str, view: &str) -> String {
    format!(
        "SELECT {columns} \
           FROM itunes.itunes a \
           JOIN {view} b ON (a.persistent_id = b.itunes_id) \
          ORDER BY row_number ASC"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_join_sql() {
        let sql = view_join_sql("name, artist", "year_2019");
        assert_eq!(
            sql,
            "SELECT name, artist FROM itunes.itunes a \
             JOIN year_2019 b ON (a.persistent_id = b.itunes_id) \
             ORDER BY row_number ASC"
        );
    }
}
