//! Merges a file's header with the destination table it is loaded into.

use std::collections::BTreeMap;

use crate::types::{CanonicalType, ColumnDescriptor, ColumnOrigin, PhysicalColumn, TargetColumn, TargetSchema};

use super::field_names::ValidatedHeader;

/// Position of `name` among `columns`; an exact match wins over a case-insensitive one because
/// the store folds identifier case.
fn find_column(columns: &[TargetColumn], name: &str) -> Option<usize> {
    columns
        .iter()
        .position(|c| c.name == name)
        .or_else(|| columns.iter().position(|c| c.name.to_lowercase() == name.to_lowercase()))
}

fn find_override(overrides: &BTreeMap<String, CanonicalType>, name: &str) -> Option<CanonicalType> {
    overrides.get(name).copied().or_else(|| {
        overrides
            .iter()
            .find(|(k, _)| k.to_lowercase() == name.to_lowercase())
            .map(|(_, t)| *t)
    })
}

/// Resolves the committed type of every column and where each header position lands.
///
/// Per header column the committed type is the stored override, else the existing physical type,
/// else the inferred type. Table columns missing from the header are kept as they are. `inferred`
/// must hold one descriptor per header position.
pub fn reconcile(
    header: &ValidatedHeader,
    inferred: &[ColumnDescriptor],
    existing_columns: &[PhysicalColumn],
    stored_overrides: &BTreeMap<String, CanonicalType>,
) -> TargetSchema {
    let mut columns: Vec<TargetColumn> = existing_columns
        .iter()
        .filter(|c| !c.is_system())
        .map(|c| TargetColumn {
            name: c.name.clone(),
            column_type: c.canonical_type(),
            origin: ColumnOrigin::Existing,
        })
        .collect();

    let mut descriptors = inferred.to_vec();
    let mut source_positions = Vec::with_capacity(header.len());

    for (position, name) in header.names().iter().enumerate() {
        let inferred_type = descriptors
            .get(position)
            .map(|d| d.inferred_type)
            .unwrap_or(CanonicalType::Text);

        let (index, override_type) = match find_column(&columns, name) {
            Some(idx) => {
                let column = &mut columns[idx];
                let override_type = find_override(stored_overrides, &column.name);
                if let Some(wanted) = override_type {
                    if wanted != column.column_type {
                        column.origin = ColumnOrigin::Retyped {
                            from: column.column_type,
                        };
                        column.column_type = wanted;
                    }
                }
                (idx, override_type)
            }
            None => {
                let override_type = find_override(stored_overrides, name);
                columns.push(TargetColumn {
                    name: name.clone(),
                    column_type: override_type.unwrap_or(inferred_type),
                    origin: ColumnOrigin::Added,
                });
                (columns.len() - 1, override_type)
            }
        };

        match descriptors.get_mut(position) {
            Some(d) => d.override_type = override_type,
            None => descriptors.push(ColumnDescriptor {
                name: name.clone(),
                inferred_type,
                override_type,
                position,
            }),
        }
        source_positions.push(index);
    }

    TargetSchema {
        columns,
        source_positions,
        descriptors,
        table_exists: !existing_columns.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field_names::{validate_header, FieldNameRules};
    use crate::types::ColumnInfo;

    fn header(names: &[&str]) -> ValidatedHeader {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        validate_header(&names, &FieldNameRules::default()).unwrap()
    }

    fn inferred(types: &[(&str, CanonicalType)]) -> Vec<ColumnDescriptor> {
        types
            .iter()
            .enumerate()
            .map(|(position, (name, t))| ColumnDescriptor {
                name: name.to_string(),
                inferred_type: *t,
                override_type: None,
                position,
            })
            .collect()
    }

    fn physical(name: &str, data_type: &str) -> PhysicalColumn {
        PhysicalColumn {
            name: name.to_string(),
            data_type: data_type.to_string(),
            info: ColumnInfo::default(),
        }
    }

    fn simple_table() -> Vec<PhysicalColumn> {
        vec![
            physical("_id", "BIGINT"),
            physical("_full_text", "VARCHAR"),
            physical("date", "TIMESTAMP"),
            physical("temperature", "DOUBLE"),
            physical("place", "VARCHAR"),
        ]
    }

    #[test]
    fn new_table_uses_inferred_types() {
        let schema = reconcile(
            &header(&["date", "temperature", "place"]),
            &inferred(&[
                ("date", CanonicalType::Timestamp),
                ("temperature", CanonicalType::Numeric),
                ("place", CanonicalType::Text),
            ]),
            &[],
            &BTreeMap::new(),
        );
        assert!(!schema.table_exists);
        assert_eq!(schema.added().count(), 3);
        assert_eq!(schema.source_positions, vec![0, 1, 2]);
        assert_eq!(schema.columns[0].column_type, CanonicalType::Timestamp);
    }

    #[test]
    fn reloading_the_same_file_is_a_schema_noop() {
        let schema = reconcile(
            &header(&["date", "temperature", "place"]),
            &inferred(&[
                ("date", CanonicalType::Timestamp),
                ("temperature", CanonicalType::Numeric),
                ("place", CanonicalType::Text),
            ]),
            &simple_table(),
            &BTreeMap::new(),
        );
        assert!(schema.is_schema_noop());
        assert_eq!(schema.column_names().collect::<Vec<_>>(), vec!["date", "temperature", "place"]);
    }

    #[test]
    fn physical_type_beats_fresh_inference() {
        let schema = reconcile(
            &header(&["temperature"]),
            &inferred(&[("temperature", CanonicalType::Text)]),
            &simple_table(),
            &BTreeMap::new(),
        );
        assert_eq!(schema.columns[1].column_type, CanonicalType::Numeric);
        assert_eq!(schema.source_positions, vec![1]);
        assert!(schema.is_schema_noop());
    }

    #[test]
    fn overrides_are_sticky_and_retype_existing_columns() {
        let overrides = BTreeMap::from([("temperature".to_string(), CanonicalType::Text)]);
        let schema = reconcile(
            &header(&["date", "temperature", "place"]),
            &inferred(&[
                ("date", CanonicalType::Timestamp),
                ("temperature", CanonicalType::Numeric),
                ("place", CanonicalType::Text),
            ]),
            &simple_table(),
            &overrides,
        );
        let temperature = &schema.columns[1];
        assert_eq!(temperature.column_type, CanonicalType::Text);
        assert_eq!(
            temperature.origin,
            ColumnOrigin::Retyped {
                from: CanonicalType::Numeric
            }
        );
        assert_eq!(schema.descriptors[1].override_type, Some(CanonicalType::Text));
        assert_eq!(schema.descriptors[1].effective_type(), CanonicalType::Text);
    }

    #[test]
    fn new_columns_append_and_missing_columns_stay() {
        let schema = reconcile(
            &header(&["place", "humidity"]),
            &inferred(&[("place", CanonicalType::Text), ("humidity", CanonicalType::Numeric)]),
            &simple_table(),
            &BTreeMap::new(),
        );
        assert_eq!(
            schema.column_names().collect::<Vec<_>>(),
            vec!["date", "temperature", "place", "humidity"]
        );
        assert_eq!(schema.source_positions, vec![2, 3]);
        assert_eq!(schema.added().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["humidity"]);
    }

    #[test]
    fn header_matches_existing_columns_ignoring_case() {
        let schema = reconcile(
            &header(&["Place"]),
            &inferred(&[("Place", CanonicalType::Text)]),
            &simple_table(),
            &BTreeMap::new(),
        );
        assert_eq!(schema.source_positions, vec![2]);
        assert!(schema.is_schema_noop());
    }
}
